//! Request dispatcher: routes decoded messages to the document store and
//! diagnostic engine, and builds the outgoing reply or push.

use serde::Serialize;
use serde_json::Value;

use crate::codec;
use crate::documents::DocumentStore;
use crate::protocol::{Envelope, Message, Outgoing, RequestId, error_code, method};
use crate::types::{
    CompletionItem, Diagnostic, Hover, InitializeResult, Location, Position,
    PublishDiagnosticsParams, Range, ServerCapabilities, ServerInfo, TextDocumentPositionParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    /// `shutdown` was answered; requests are still served until `exit`.
    ShutDown,
    Exited,
}

/// Single-writer session: every message runs to completion before the next.
#[derive(Debug)]
pub struct Dispatcher {
    state: SessionState,
    documents: DocumentStore,
    server_info: ServerInfo,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DocumentStore::default(), ServerInfo::default())
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(documents: DocumentStore, server_info: ServerInfo) -> Self {
        Self {
            state: SessionState::Uninitialized,
            documents,
            server_info,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_exited(&self) -> bool {
        self.state == SessionState::Exited
    }

    #[must_use]
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Decode one raw frame, dispatch it and encode the reply, if any.
    ///
    /// Framing and parse failures are logged and the frame is dropped.
    pub fn handle_frame(&mut self, frame: &str) -> Option<String> {
        let envelope = match codec::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Dropping inbound frame: {e}");
                return None;
            }
        };

        let outgoing = self.handle_envelope(envelope)?;
        match codec::encode(&outgoing) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::error!("Failed to encode outgoing message: {e}");
                None
            }
        }
    }

    pub fn handle_envelope(&mut self, envelope: Envelope) -> Option<Outgoing> {
        tracing::info!(
            method = %envelope.method,
            id = ?envelope.id,
            content_length = envelope.content_length,
            "Method received"
        );

        if self.is_exited() {
            tracing::debug!("Session exited, ignoring {}", envelope.method);
            return None;
        }

        match Message::from_envelope(envelope) {
            Ok(message) => self.handle(message),
            Err(e) => {
                tracing::warn!("Rejecting message: {e}");
                e.request_id()
                    .map(|id| Outgoing::error(id.clone(), error_code::INVALID_PARAMS, e.to_string()))
            }
        }
    }

    pub fn handle(&mut self, message: Message) -> Option<Outgoing> {
        match message {
            Message::Initialize { id, params } => {
                if let Some(client) = &params.client_info {
                    tracing::info!(
                        "Connected to: {} {}",
                        client.name,
                        client.version.as_deref().unwrap_or("")
                    );
                }
                self.state = SessionState::Initialized;
                respond(id, &self.initialize_result())
            }
            Message::Initialized => {
                tracing::debug!("Client finished initialization");
                None
            }
            Message::Shutdown { id } => {
                tracing::info!("Shutdown requested");
                self.state = SessionState::ShutDown;
                Some(Outgoing::response(id, Value::Null))
            }
            Message::Exit => {
                tracing::info!("Exit received");
                self.state = SessionState::Exited;
                None
            }
            Message::DidOpen(params) => {
                let item = params.text_document;
                tracing::info!("Opened: {} (version {})", item.uri, item.version);
                let diagnostics = self
                    .documents
                    .open_document(item.uri.clone(), item.text, item.version);
                publish(item.uri, item.version, diagnostics)
            }
            Message::DidChange(params) => {
                let doc = params.text_document;
                tracing::debug!("Changed: {} (version {})", doc.uri, doc.version);
                let diagnostics = self
                    .documents
                    .update_document(&doc.uri, doc.version, params.content_changes);
                publish(doc.uri, doc.version, diagnostics)
            }
            Message::Hover { id, params } => respond(id, &self.hover(&params)),
            Message::Definition { id, params } => respond(id, &definition(params)),
            Message::CodeAction { id, params } => {
                let uri = params.text_document.uri;
                let actions = self
                    .documents
                    .text(&uri)
                    .map(|text| self.documents.engine().suggest_actions(text, &uri))
                    .unwrap_or_default();
                respond(id, &actions)
            }
            Message::Completion { id, .. } => respond(id, &completion_items()),
            Message::PublishDiagnostics => {
                tracing::debug!("Ignoring client-sent publishDiagnostics");
                None
            }
            Message::Unknown { method: name, .. } => {
                tracing::error!("Not handling: {name}");
                None
            }
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            capabilities: ServerCapabilities::default(),
            server_info: self.server_info.clone(),
        }
    }

    /// Summarize the document; an untracked URI reports zero characters.
    fn hover(&self, params: &TextDocumentPositionParams) -> Hover {
        let uri = &params.text_document.uri;
        let characters = self
            .documents
            .text(uri)
            .map_or(0, |text| text.encode_utf16().count());
        Hover {
            contents: format!("File: {uri}, Characters: {characters}"),
        }
    }
}

/// The line above the requested position, at column 0.
fn definition(params: TextDocumentPositionParams) -> Location {
    let target = Position::new(params.position.line.saturating_sub(1), 0);
    Location {
        uri: params.text_document.uri,
        range: Range::new(target, target),
    }
}

fn completion_items() -> Vec<CompletionItem> {
    vec![CompletionItem {
        label: String::from("Neovim (BTW)"),
        detail: Some(String::from("Very cool editor")),
        documentation: Some(String::from("Way better than VS C*ode")),
    }]
}

fn respond<T: Serialize>(id: RequestId, result: &T) -> Option<Outgoing> {
    match serde_json::to_value(result) {
        Ok(value) => Some(Outgoing::response(id, value)),
        Err(e) => {
            tracing::error!("Failed to serialize result for request {id}: {e}");
            Some(Outgoing::error(
                id,
                error_code::INTERNAL_ERROR,
                "failed to serialize result",
            ))
        }
    }
}

fn publish(uri: String, version: i32, diagnostics: Vec<Diagnostic>) -> Option<Outgoing> {
    let params = PublishDiagnosticsParams {
        uri,
        version: Some(version),
        diagnostics,
    };
    match serde_json::to_value(&params) {
        Ok(value) => Some(Outgoing::notification(method::PUBLISH_DIAGNOSTICS, value)),
        Err(e) => {
            tracing::error!("Failed to serialize diagnostics for {}: {e}", params.uri);
            None
        }
    }
}
