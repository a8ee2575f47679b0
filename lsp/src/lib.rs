//! Minimal language server: Content-Length framing, full-sync document
//! tracking and keyword diagnostics over a byte stream.

pub mod codec;
pub mod diagnostics;
pub mod dispatch;
pub mod documents;
pub mod protocol;
pub mod types;

mod server;

pub use diagnostics::{ActionRule, DiagnosticEngine, RuleError, ScanRule};
pub use dispatch::{Dispatcher, SessionState};
pub use documents::{Document, DocumentStore};
pub use server::{LspServer, ServeOutcome};
pub use types::{DiagnosticSeverity, ServerInfo};
