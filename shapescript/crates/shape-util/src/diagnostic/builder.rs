//! Diagnostic builder for fluent diagnostic construction.

use super::{Diagnostic, DiagnosticCode, Handler, Level};
use crate::span::Span;

/// A source code snippet for display in diagnostics.
///
/// Contains the affected source line with 1-based column highlighting.
#[derive(Clone, Debug)]
pub struct SourceSnippet {
    /// The source line content.
    pub line: String,
    /// Line number (1-based).
    pub line_number: usize,
    /// Column where the issue starts (1-based).
    pub start_column: usize,
    /// Column where the issue ends (1-based).
    pub end_column: usize,
    /// Optional label to display under the highlighted range.
    pub label: Option<String>,
}

impl SourceSnippet {
    /// Create a new source snippet.
    pub fn new(
        line: impl Into<String>,
        line_number: usize,
        start_column: usize,
        end_column: usize,
        label: Option<impl Into<String>>,
    ) -> Self {
        Self {
            line: line.into(),
            line_number,
            start_column,
            end_column,
            label: label.map(Into::into),
        }
    }
}

/// Fluent builder for [`Diagnostic`]s.
///
/// # Examples
///
/// ```
/// use shape_util::diagnostic::{DiagnosticBuilder, E_PARSE_UNEXPECTED_TOKEN};
/// use shape_util::span::Span;
///
/// let diag = DiagnosticBuilder::error("unexpected token 'default'")
///     .code(E_PARSE_UNEXPECTED_TOKEN)
///     .span(Span::new(12, 19))
///     .hint("Did you mean 'else'?")
///     .suggestion("else")
///     .build();
/// assert_eq!(diag.suggestion.as_deref(), Some("else"));
/// ```
#[derive(Debug)]
pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    /// Start building a diagnostic at the given level.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic::new(level, message, Span::DUMMY),
        }
    }

    /// Start building an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    /// Start building a warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    /// Set the source span.
    pub fn span(mut self, span: Span) -> Self {
        self.diagnostic.span = span;
        self
    }

    /// Set the diagnostic code.
    pub fn code(mut self, code: DiagnosticCode) -> Self {
        self.diagnostic.code = Some(code);
        self
    }

    /// Attach an imperative hint sentence.
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.diagnostic.hint = Some(hint.into());
        self
    }

    /// Attach a deterministic replacement suggestion.
    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.diagnostic.suggestion = Some(suggestion.into());
        self
    }

    /// Attach a contextual note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.diagnostic.notes.push(note.into());
        self
    }

    /// Attach a source snippet.
    pub fn snippet(mut self, snippet: SourceSnippet) -> Self {
        self.diagnostic.snippets.push(snippet);
        self
    }

    /// Finish building, returning the diagnostic.
    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }

    /// Finish building and emit into a handler.
    pub fn emit(self, handler: &Handler) {
        handler.emit(self.diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::codes::E_LEX_UNEXPECTED_TOKEN;

    #[test]
    fn builder_sets_all_fields() {
        let diag = DiagnosticBuilder::error("unexpected token '=='")
            .code(E_LEX_UNEXPECTED_TOKEN)
            .span(Span::new(4, 6))
            .hint("Did you mean '='?")
            .suggestion("=")
            .note("comparison uses a single '='")
            .build();

        assert_eq!(diag.level, Level::Error);
        assert_eq!(diag.span, Span::new(4, 6));
        assert_eq!(diag.code, Some(E_LEX_UNEXPECTED_TOKEN));
        assert_eq!(diag.hint.as_deref(), Some("Did you mean '='?"));
        assert_eq!(diag.suggestion.as_deref(), Some("="));
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn builder_emit_goes_through_handler() {
        let handler = Handler::new();
        DiagnosticBuilder::warning("unused value").emit(&handler);
        assert_eq!(handler.diagnostics().len(), 1);
        assert!(!handler.has_errors());
    }
}
