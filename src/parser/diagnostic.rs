//! Diagnostics collected while preprocessing and parsing.
//!
//! Malformed input never aborts processing; it produces one of these and the
//! processor carries on.

use std::fmt;
use std::sync::Arc;

use crate::base::Position;

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Short label used in task files and dumps.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "warn",
            Severity::Error => "err",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A diagnostic message with location. The file is the owning document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Line (0-indexed).
    pub line: u32,
    /// Column (0-indexed).
    pub column: u32,
    /// Length of the offending text, 0 if unknown.
    pub length: u32,
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn new(severity: Severity, position: Position, message: impl Into<Arc<str>>) -> Self {
        Self {
            severity,
            line: position.line,
            column: position.column,
            length: 0,
            message: message.into(),
        }
    }

    pub fn warning(position: Position, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Warning, position, message)
    }

    pub fn error(position: Position, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Error, position, message)
    }

    pub fn fatal(position: Position, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Fatal, position, message)
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}
