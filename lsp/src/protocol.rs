//! JSON-RPC envelopes and the typed message set the server understands.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{
    CodeActionParams, DidChangeTextDocumentParams, DidOpenTextDocumentParams, InitializeParams,
    TextDocumentPositionParams,
};

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names handled by the dispatcher.
pub mod method {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const EXIT: &str = "exit";
    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CHANGE: &str = "textDocument/didChange";
    pub const HOVER: &str = "textDocument/hover";
    pub const DEFINITION: &str = "textDocument/definition";
    pub const CODE_ACTION: &str = "textDocument/codeAction";
    pub const COMPLETION: &str = "textDocument/completion";
    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
}

/// Reserved JSON-RPC error codes.
pub mod error_code {
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

/// A decoded inbound request or notification.
///
/// `id` is `None` for notifications. `content_length` is the length the
/// frame header declared, which the codec has checked against the body.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub id: Option<RequestId>,
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub content_length: usize,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
}

impl Envelope {
    pub(crate) fn from_json(content: &str, content_length: usize) -> Result<Self, serde_json::Error> {
        let raw: RawEnvelope = serde_json::from_str(content)?;
        Ok(Self {
            id: raw.id,
            jsonrpc: raw.jsonrpc,
            method: raw.method,
            params: raw.params,
            content_length,
        })
    }

    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub error: ResponseError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
}

/// Anything the server writes back to the client.
///
/// Serializes to the bare JSON-RPC object, without a variant tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outgoing {
    Response(Response),
    Error(ErrorResponse),
    Notification(Notification),
}

impl Outgoing {
    pub fn response(id: RequestId, result: Value) -> Self {
        Self::Response(Response {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        })
    }

    pub fn error(id: RequestId, code: i64, message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse {
            jsonrpc: JSONRPC_VERSION,
            id,
            error: ResponseError {
                code,
                message: message.into(),
            },
        })
    }

    pub fn notification(method: &'static str, params: Value) -> Self {
        Self::Notification(Notification {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("request {method} is missing an id")]
    MissingId { method: String },
    #[error("invalid params for {method}: {source}")]
    InvalidParams {
        method: String,
        id: Option<RequestId>,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// The id to answer with, if the failing message was a request.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            ProtocolError::MissingId { .. } => None,
            ProtocolError::InvalidParams { id, .. } => id.as_ref(),
        }
    }
}

/// An inbound message with its params decoded for its method.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Initialize {
        id: RequestId,
        params: InitializeParams,
    },
    Initialized,
    Shutdown {
        id: RequestId,
    },
    Exit,
    DidOpen(DidOpenTextDocumentParams),
    DidChange(DidChangeTextDocumentParams),
    Hover {
        id: RequestId,
        params: TextDocumentPositionParams,
    },
    Definition {
        id: RequestId,
        params: TextDocumentPositionParams,
    },
    CodeAction {
        id: RequestId,
        params: CodeActionParams,
    },
    Completion {
        id: RequestId,
        params: TextDocumentPositionParams,
    },
    /// Sent by some clients; the server only ever publishes, never consumes.
    PublishDiagnostics,
    Unknown {
        id: Option<RequestId>,
        method: String,
    },
}

impl Message {
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let Envelope {
            id,
            method: name,
            params,
            ..
        } = envelope;

        let message = match name.as_str() {
            method::INITIALIZE => {
                let (id, params) = request(id, &name, params)?;
                Self::Initialize { id, params }
            }
            method::INITIALIZED => Self::Initialized,
            method::SHUTDOWN => Self::Shutdown {
                id: id.ok_or_else(|| ProtocolError::MissingId {
                    method: name.clone(),
                })?,
            },
            method::EXIT => Self::Exit,
            method::DID_OPEN => Self::DidOpen(notification(&name, params)?),
            method::DID_CHANGE => Self::DidChange(notification(&name, params)?),
            method::HOVER => {
                let (id, params) = request(id, &name, params)?;
                Self::Hover { id, params }
            }
            method::DEFINITION => {
                let (id, params) = request(id, &name, params)?;
                Self::Definition { id, params }
            }
            method::CODE_ACTION => {
                let (id, params) = request(id, &name, params)?;
                Self::CodeAction { id, params }
            }
            method::COMPLETION => {
                let (id, params) = request(id, &name, params)?;
                Self::Completion { id, params }
            }
            method::PUBLISH_DIAGNOSTICS => Self::PublishDiagnostics,
            _ => Self::Unknown { id, method: name },
        };
        Ok(message)
    }
}

fn request<P: DeserializeOwned>(
    id: Option<RequestId>,
    method: &str,
    params: Value,
) -> Result<(RequestId, P), ProtocolError> {
    let Some(id) = id else {
        return Err(ProtocolError::MissingId {
            method: method.to_string(),
        });
    };
    let params = parse_params(params).map_err(|source| ProtocolError::InvalidParams {
        method: method.to_string(),
        id: Some(id.clone()),
        source,
    })?;
    Ok((id, params))
}

fn notification<P: DeserializeOwned>(method: &str, params: Value) -> Result<P, ProtocolError> {
    parse_params(params).map_err(|source| ProtocolError::InvalidParams {
        method: method.to_string(),
        id: None,
        source,
    })
}

/// Absent params decode as an empty object so all-optional param types still parse.
fn parse_params<P: DeserializeOwned>(params: Value) -> Result<P, serde_json::Error> {
    match params {
        Value::Null => serde_json::from_value(Value::Object(serde_json::Map::new())),
        other => serde_json::from_value(other),
    }
}
