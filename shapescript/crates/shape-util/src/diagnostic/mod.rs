//! Diagnostic module - Error and warning reporting infrastructure.
//!
//! This module provides types for creating, formatting, and collecting
//! diagnostics. Every ShapeScript error surfaces as a [`Diagnostic`] with a
//! single-line `message`, an optional imperative `hint` ("Did you mean
//! 'else'?"), an optional machine-applicable `suggestion` token, and a byte
//! range into the offending source.
//!
//! # Examples
//!
//! ```
//! use shape_util::diagnostic::{DiagnosticBuilder, DiagnosticCode, Handler};
//! use shape_util::span::Span;
//!
//! let handler = Handler::new();
//! DiagnosticBuilder::error("unexpected token '!='")
//!     .code(shape_util::diagnostic::E_LEX_UNEXPECTED_TOKEN)
//!     .span(Span::new(4, 6))
//!     .suggestion("<>")
//!     .emit(&handler);
//!
//! assert!(handler.has_errors());
//! ```

mod builder;
mod codes;

pub use builder::{DiagnosticBuilder, SourceSnippet};
pub use codes::DiagnosticCode;

pub use codes::{
    E_LEX_INVALID_COLOR, E_LEX_INVALID_ESCAPE, E_LEX_INVALID_NUMBER, E_LEX_UNEXPECTED_TOKEN,
    E_LEX_UNTERMINATED_STRING, E_PARSE_UNEXPECTED_TOKEN, E_RUNTIME_ASSERTION,
    E_RUNTIME_CYCLIC_IMPORT, E_RUNTIME_FILE_NOT_FOUND, E_RUNTIME_INVALID_INDEX,
    E_RUNTIME_MISSING_ARGUMENT, E_RUNTIME_REDEFINITION, E_RUNTIME_TYPE_MISMATCH,
    E_RUNTIME_UNEXPECTED_ARGUMENT, E_RUNTIME_UNKNOWN_MEMBER, E_RUNTIME_UNKNOWN_SYMBOL,
    W_UNUSED_VALUE,
};

use crate::span::Span;
use std::cell::RefCell;
use std::fmt;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that aborts parsing or evaluation.
    Error,
    /// A non-fatal warning (e.g. an unused value).
    Warning,
    /// Additional information attached to another diagnostic.
    Note,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with severity and location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Diagnostic severity level.
    pub level: Level,
    /// Main diagnostic message, a single short phrase.
    pub message: String,
    /// Source location.
    pub span: Span,
    /// Optional machine-readable diagnostic code.
    pub code: Option<DiagnosticCode>,
    /// Optional imperative sentence suggesting a fix.
    pub hint: Option<String>,
    /// Optional replacement token when the fix is a deterministic rewrite.
    pub suggestion: Option<String>,
    /// Additional notes for context.
    pub notes: Vec<String>,
    /// Source code snippets for display.
    pub snippets: Vec<SourceSnippet>,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
            code: None,
            hint: None,
            suggestion: None,
            notes: Vec::new(),
            snippets: Vec::new(),
        }
    }

    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.level, code, self.message)?,
            None => write!(f, "{}: {}", self.level, self.message)?,
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nhint: {}", hint)?;
        }
        Ok(())
    }
}

/// Collects diagnostics emitted during a compilation or evaluation pass.
///
/// The handler is single-threaded by design (evaluation of one program is
/// strictly sequential); interior mutability keeps the emitting APIs `&self`.
#[derive(Default, Debug)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    error_count: RefCell<usize>,
}

impl Handler {
    /// Create a new empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        if diagnostic.level == Level::Error {
            *self.error_count.borrow_mut() += 1;
        }
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Record an error with just a message and span.
    pub fn error(&self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::error(message, span));
    }

    /// Record a warning with just a message and span.
    pub fn warning(&self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::warning(message, span));
    }

    /// Whether any error-level diagnostic has been emitted.
    pub fn has_errors(&self) -> bool {
        *self.error_count.borrow() > 0
    }

    /// Number of error-level diagnostics emitted.
    pub fn error_count(&self) -> usize {
        *self.error_count.borrow()
    }

    /// Clone out all collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Drain all collected diagnostics, resetting the handler.
    pub fn take(&self) -> Vec<Diagnostic> {
        *self.error_count.borrow_mut() = 0;
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_counts_errors_not_warnings() {
        let handler = Handler::new();
        assert!(!handler.has_errors());
        handler.warning("unused value", Span::DUMMY);
        assert!(!handler.has_errors());
        handler.error("unknown symbol 'qube'", Span::new(0, 4));
        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.diagnostics().len(), 2);
    }

    #[test]
    fn handler_take_resets() {
        let handler = Handler::new();
        handler.error("boom", Span::DUMMY);
        let taken = handler.take();
        assert_eq!(taken.len(), 1);
        assert!(!handler.has_errors());
        assert!(handler.diagnostics().is_empty());
    }

    #[test]
    fn display_includes_code_and_hint() {
        let mut diag = Diagnostic::error("unexpected token '&&'", Span::new(2, 4));
        diag.code = Some(super::codes::E_LEX_UNEXPECTED_TOKEN);
        diag.hint = Some("Did you mean 'and'?".to_string());
        let rendered = diag.to_string();
        assert!(rendered.starts_with("error["));
        assert!(rendered.contains("unexpected token"));
        assert!(rendered.contains("Did you mean 'and'?"));
    }
}
