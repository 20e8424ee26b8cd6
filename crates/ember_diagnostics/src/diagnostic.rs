//! Structured diagnostic messages with severity, codes, and notes.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured diagnostic message.
///
/// Diagnostics are the mechanism for reporting warnings, notes, and
/// accumulated errors from placement stages. Each diagnostic includes a
/// severity level, a unique code, a primary message, and optional
/// explanatory notes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// Explanatory footnotes (e.g. "note: ...").
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error diagnostic with the given code and message.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic with the given code and message.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Creates a new note diagnostic with the given code and message.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            code,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Appends an explanatory note and returns the diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn error_constructor() {
        let d = Diagnostic::error(DiagnosticCode::new(Category::Error, 210), "grid mismatch");
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "grid mismatch");
        assert!(d.notes.is_empty());
    }

    #[test]
    fn warning_constructor() {
        let d = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 104), "zero width");
        assert_eq!(d.severity, Severity::Warning);
    }

    #[test]
    fn note_constructor() {
        let d = Diagnostic::note(DiagnosticCode::new(Category::Placement, 1), "status");
        assert_eq!(d.severity, Severity::Note);
    }

    #[test]
    fn with_note_appends() {
        let d = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 104), "zero width")
            .with_note("substituting a 1-track channel");
        assert_eq!(d.notes.len(), 1);
    }

    #[test]
    fn display_format() {
        let d = Diagnostic::error(DiagnosticCode::new(Category::Error, 7), "boom");
        assert_eq!(format!("{d}"), "error[E007]: boom");
    }

    #[test]
    fn serde_roundtrip() {
        let d = Diagnostic::warning(DiagnosticCode::new(Category::Timing, 12), "slow path")
            .with_note("criticality 0.99");
        let json = serde_json::to_string(&d).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, "slow path");
        assert_eq!(back.notes.len(), 1);
    }
}
