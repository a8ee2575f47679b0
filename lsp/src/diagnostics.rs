//! Diagnostic engine: term rules scanned line by line over document text.
//!
//! Each [`ScanRule`] flags every occurrence of its term. The designated
//! [`ActionRule`] turns each occurrence of its term into a pair of code
//! actions: one replacing the term, one redacting it.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{
    CodeAction, Diagnostic, DiagnosticSeverity, Position, Range, TextEdit, WorkspaceEdit,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("rule term must not be empty")]
    EmptyTerm,
    #[error("rule message must not be empty")]
    EmptyMessage,
    #[error("code action replacement must not be empty")]
    EmptyReplacement,
}

const DEFAULT_SOURCE: &str = "quill";

fn default_severity() -> DiagnosticSeverity {
    DiagnosticSeverity::Warning
}

fn default_source() -> String {
    String::from(DEFAULT_SOURCE)
}

#[derive(Deserialize)]
struct RawScanRule {
    term: String,
    #[serde(default = "default_severity")]
    severity: DiagnosticSeverity,
    #[serde(default = "default_source")]
    source: String,
    message: String,
}

/// A term to flag, and how to report it.
///
/// Invariant: `term` and `message` are non-empty (enforced via
/// `#[serde(try_from)]` at the deserialization boundary).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawScanRule")]
pub struct ScanRule {
    term: String,
    severity: DiagnosticSeverity,
    source: String,
    message: String,
}

impl TryFrom<RawScanRule> for ScanRule {
    type Error = RuleError;

    fn try_from(raw: RawScanRule) -> Result<Self, Self::Error> {
        Self::new(raw.term, raw.severity, raw.source, raw.message)
    }
}

impl ScanRule {
    pub fn new(
        term: impl Into<String>,
        severity: DiagnosticSeverity,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let term = term.into();
        let message = message.into();
        if term.is_empty() {
            return Err(RuleError::EmptyTerm);
        }
        if message.trim().is_empty() {
            return Err(RuleError::EmptyMessage);
        }
        Ok(Self {
            term,
            severity,
            source: source.into(),
            message,
        })
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The built-in rule set.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![
            Self {
                term: String::from("VS Code"),
                severity: DiagnosticSeverity::Warning,
                source: String::from("Common Sense"),
                message: String::from("Please make sure we use a good language"),
            },
            Self {
                term: String::from("Neovim"),
                severity: DiagnosticSeverity::Warning,
                source: String::from("Common Sense"),
                message: String::from("Great choice :)"),
            },
        ]
    }
}

#[derive(Deserialize)]
struct RawActionRule {
    term: String,
    replacement: String,
    redacted: Option<String>,
    replace_title: Option<String>,
    redact_title: Option<String>,
}

/// The rule whose matches produce code actions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawActionRule")]
pub struct ActionRule {
    term: String,
    replacement: String,
    redacted: String,
    replace_title: String,
    redact_title: String,
}

impl TryFrom<RawActionRule> for ActionRule {
    type Error = RuleError;

    fn try_from(raw: RawActionRule) -> Result<Self, Self::Error> {
        let mut rule = Self::new(raw.term, raw.replacement)?;
        if let Some(redacted) = raw.redacted {
            rule.redacted = redacted;
        }
        if let Some(title) = raw.replace_title {
            rule.replace_title = title;
        }
        rule.redact_title = raw
            .redact_title
            .unwrap_or_else(|| format!("Censor {}", rule.redacted));
        Ok(rule)
    }
}

impl ActionRule {
    /// Build a rule with derived titles and a masked redaction of `term`.
    pub fn new(term: impl Into<String>, replacement: impl Into<String>) -> Result<Self, RuleError> {
        let term = term.into();
        let replacement = replacement.into();
        if term.is_empty() {
            return Err(RuleError::EmptyTerm);
        }
        if replacement.is_empty() {
            return Err(RuleError::EmptyReplacement);
        }
        let redacted = mask(&term);
        Ok(Self {
            replace_title: format!("Replace {term} with {replacement}"),
            redact_title: format!("Censor {redacted}"),
            term,
            replacement,
            redacted,
        })
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    #[must_use]
    pub fn redacted(&self) -> &str {
        &self.redacted
    }

    #[must_use]
    pub fn replace_title(&self) -> &str {
        &self.replace_title
    }

    #[must_use]
    pub fn redact_title(&self) -> &str {
        &self.redact_title
    }
}

impl Default for ActionRule {
    fn default() -> Self {
        Self {
            term: String::from("VS Code"),
            replacement: String::from("Neovim"),
            redacted: String::from("VS C*de"),
            replace_title: String::from("Replace VS C*de with a superior editor"),
            redact_title: String::from("Censor VS C*de"),
        }
    }
}

/// Star out the second character of the last word: `VS Code` -> `VS C*de`.
fn mask(term: &str) -> String {
    let word_start = term.rfind(' ').map_or(0, |i| i + 1);
    let mut chars = term[word_start..].char_indices().skip(1);
    match chars.next() {
        Some((offset, ch)) => {
            let at = word_start + offset;
            format!("{}*{}", &term[..at], &term[at + ch.len_utf8()..])
        }
        None => "*".repeat(term.chars().count()),
    }
}

/// Pure text scanner producing diagnostics and code actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEngine {
    rules: Vec<ScanRule>,
    action: ActionRule,
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new(ScanRule::builtin(), ActionRule::default())
    }
}

impl DiagnosticEngine {
    #[must_use]
    pub fn new(rules: Vec<ScanRule>, action: ActionRule) -> Self {
        Self { rules, action }
    }

    #[must_use]
    pub fn rules(&self) -> &[ScanRule] {
        &self.rules
    }

    #[must_use]
    pub fn action_rule(&self) -> &ActionRule {
        &self.action
    }

    /// Diagnostics in line order, then rule order, then left to right.
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for (line_number, line) in lines(text) {
            for rule in &self.rules {
                for range in term_ranges(line, line_number, rule.term()) {
                    diagnostics.push(Diagnostic {
                        range,
                        severity: rule.severity(),
                        source: rule.source().to_string(),
                        message: rule.message().to_string(),
                    });
                }
            }
        }
        diagnostics
    }

    /// Two actions per occurrence of the action term: replace, then redact.
    #[must_use]
    pub fn suggest_actions(&self, text: &str, uri: &str) -> Vec<CodeAction> {
        let rule = &self.action;
        let mut actions = Vec::new();
        for (line_number, line) in lines(text) {
            for range in term_ranges(line, line_number, rule.term()) {
                actions.push(single_edit_action(
                    rule.replace_title(),
                    uri,
                    range,
                    rule.replacement(),
                ));
                actions.push(single_edit_action(
                    rule.redact_title(),
                    uri,
                    range,
                    rule.redacted(),
                ));
            }
        }
        actions
    }
}

fn single_edit_action(title: &str, uri: &str, range: Range, new_text: &str) -> CodeAction {
    let mut changes = BTreeMap::new();
    changes.insert(
        uri.to_string(),
        vec![TextEdit {
            range,
            new_text: new_text.to_string(),
        }],
    );
    CodeAction {
        title: title.to_string(),
        edit: WorkspaceEdit { changes },
    }
}

fn lines(text: &str) -> impl Iterator<Item = (u32, &str)> {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| (u32::try_from(index).unwrap_or(u32::MAX), line))
}

/// Every match of `term` in `line`.
///
/// After a match the search resumes one character past the match start,
/// so self-overlapping terms report each starting offset.
fn term_ranges(line: &str, line_number: u32, term: &str) -> Vec<Range> {
    let mut ranges = Vec::new();
    if term.is_empty() {
        return ranges;
    }

    let mut from = 0;
    while let Some(offset) = line[from..].find(term) {
        let start = from + offset;
        let end = start + term.len();
        ranges.push(Range::new(
            Position::new(line_number, utf16_column(line, start)),
            Position::new(line_number, utf16_column(line, end)),
        ));
        from = start + line[start..].chars().next().map_or(1, char::len_utf8);
    }
    ranges
}

fn utf16_column(line: &str, byte_offset: usize) -> u32 {
    let units = line[..byte_offset].encode_utf16().count();
    u32::try_from(units).unwrap_or(u32::MAX)
}
