//! Document store: the server's authoritative copy of every open buffer.

use std::collections::HashMap;

use crate::diagnostics::DiagnosticEngine;
use crate::types::{Diagnostic, TextDocumentContentChangeEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    uri: String,
    version: i32,
    text: String,
}

impl Document {
    fn new(uri: String, version: i32, text: String) -> Self {
        Self { uri, version, text }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Owns every tracked [`Document`] keyed by URI.
///
/// Mutated only through [`open_document`](Self::open_document) and
/// [`update_document`](Self::update_document); both return the diagnostics
/// for the resulting text.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, Document>,
    engine: DiagnosticEngine,
}

impl DocumentStore {
    #[must_use]
    pub fn new(engine: DiagnosticEngine) -> Self {
        Self {
            documents: HashMap::new(),
            engine,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &DiagnosticEngine {
        &self.engine
    }

    /// Track `uri` with the given text, replacing any previous state.
    pub fn open_document(&mut self, uri: String, text: String, version: i32) -> Vec<Diagnostic> {
        let diagnostics = self.engine.scan(&text);
        self.documents
            .insert(uri.clone(), Document::new(uri, version, text));
        diagnostics
    }

    /// Apply a `didChange` batch with full-document semantics.
    ///
    /// The last event's text becomes the document text; an empty batch
    /// leaves the document empty. The version is taken as given, without any
    /// monotonicity check. An untracked `uri` is first opened with empty text.
    pub fn update_document(
        &mut self,
        uri: &str,
        version: i32,
        mut changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Vec<Diagnostic> {
        let document = self.documents.entry(uri.to_string()).or_insert_with(|| {
            tracing::debug!(uri, "change for untracked document, opening it empty");
            Document::new(uri.to_string(), version, String::new())
        });

        if changes.iter().any(|change| change.range.is_some()) {
            tracing::debug!(uri, "range change applied as full document text");
        }
        document.text = changes.pop().map(|change| change.text).unwrap_or_default();
        document.version = version;

        self.engine.scan(&document.text)
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    #[must_use]
    pub fn text(&self, uri: &str) -> Option<&str> {
        self.get(uri).map(Document::text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
