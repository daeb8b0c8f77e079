//! Runtime errors.
//!
//! A [`RuntimeError`] is a kind plus the source range of the construct that
//! failed. When a sub-computation has no range of its own, the evaluator
//! substitutes the nearest enclosing statement's range before surfacing the
//! error, so every diagnostic points somewhere useful.

use shape_util::diagnostic::{self as codes, Diagnostic, DiagnosticBuilder, DiagnosticCode};
use shape_util::span::Span;
use std::path::PathBuf;
use thiserror::Error;

/// The kinds of runtime error.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RuntimeErrorKind {
    /// A value could not be converted to the type a symbol requires.
    #[error("type mismatch for {name}: expected {expected}, got {got}")]
    TypeMismatch {
        /// The symbol whose argument failed.
        name: String,
        /// Position within a tuple argument, when the mismatch is partial.
        index: Option<usize>,
        expected: String,
        got: String,
    },
    /// More operands than the symbol accepts.
    #[error("unexpected argument for {name}")]
    UnexpectedArgument { name: String, max: usize },
    /// The symbol requires an argument and none was supplied.
    #[error("missing argument for {name}")]
    MissingArgument { name: String, expected: String },
    /// A name that resolves to nothing in scope.
    #[error("unknown symbol '{name}'")]
    UnknownSymbol {
        name: String,
        /// Nearby names for the hint, best match first.
        options: Vec<String>,
    },
    /// A member that the receiver's type does not have.
    #[error("unknown member '{name}' of {of_type}")]
    UnknownMember {
        name: String,
        of_type: String,
        options: Vec<String>,
    },
    /// A subscript outside the valid range.
    #[error("index {index} out of bounds (0..{count})")]
    InvalidIndex { index: i64, count: usize },
    /// A file or font the delegate could not resolve.
    #[error("file '{name}' not found")]
    FileNotFound { name: String, at: Option<PathBuf> },
    /// A failed `assert` or an impossible option combination.
    #[error("assertion failed: {message}")]
    AssertionFailure { message: String },
    /// A reserved name bound twice in the same scope.
    #[error("cannot redefine '{name}'")]
    Redefinition { name: String },
    /// An import chain that returns to a file already being imported.
    #[error("cyclic import of '{name}'")]
    CyclicImport { name: String },
    /// The build was cancelled cooperatively.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl RuntimeErrorKind {
    /// The stable diagnostic code for this error kind.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            RuntimeErrorKind::TypeMismatch { .. } => codes::E_RUNTIME_TYPE_MISMATCH,
            RuntimeErrorKind::UnexpectedArgument { .. } => codes::E_RUNTIME_UNEXPECTED_ARGUMENT,
            RuntimeErrorKind::MissingArgument { .. } => codes::E_RUNTIME_MISSING_ARGUMENT,
            RuntimeErrorKind::UnknownSymbol { .. } => codes::E_RUNTIME_UNKNOWN_SYMBOL,
            RuntimeErrorKind::UnknownMember { .. } => codes::E_RUNTIME_UNKNOWN_MEMBER,
            RuntimeErrorKind::InvalidIndex { .. } => codes::E_RUNTIME_INVALID_INDEX,
            RuntimeErrorKind::FileNotFound { .. } => codes::E_RUNTIME_FILE_NOT_FOUND,
            RuntimeErrorKind::AssertionFailure { .. } => codes::E_RUNTIME_ASSERTION,
            RuntimeErrorKind::Redefinition { .. } => codes::E_RUNTIME_REDEFINITION,
            RuntimeErrorKind::CyclicImport { .. } => codes::E_RUNTIME_CYCLIC_IMPORT,
            // Cancellation is not a user mistake; the code is only used
            // when a host insists on rendering it.
            RuntimeErrorKind::Cancelled => codes::E_RUNTIME_ASSERTION,
        }
    }
}

/// A runtime error with its source range.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub span: Span,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The error with its range replaced when it had none of its own.
    pub fn with_enclosing_span(mut self, span: Span) -> Self {
        if self.span == Span::DUMMY {
            self.span = span;
        }
        self
    }

    /// The imperative hint sentence, if any.
    pub fn hint(&self) -> Option<String> {
        match &self.kind {
            RuntimeErrorKind::UnknownSymbol { options, .. }
            | RuntimeErrorKind::UnknownMember { options, .. } => options
                .first()
                .map(|best| format!("Did you mean '{}'?", best)),
            RuntimeErrorKind::MissingArgument { expected, .. } => {
                Some(format!("Expected {}.", expected))
            }
            RuntimeErrorKind::UnexpectedArgument { max: 0, .. } => {
                Some("Expected no argument.".to_string())
            }
            RuntimeErrorKind::UnexpectedArgument { max, .. } => {
                Some(format!("Expected at most {} values.", max))
            }
            _ => None,
        }
    }

    /// The deterministic correction token, if any.
    pub fn suggestion(&self) -> Option<&str> {
        match &self.kind {
            RuntimeErrorKind::UnknownSymbol { options, .. }
            | RuntimeErrorKind::UnknownMember { options, .. } => {
                options.first().map(|s| s.as_str())
            }
            _ => None,
        }
    }

    /// Render as a diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = DiagnosticBuilder::error(self.to_string())
            .code(self.kind.code())
            .span(self.span);
        if let Some(hint) = self.hint() {
            builder = builder.hint(hint);
        }
        if let Some(suggestion) = self.suggestion() {
            builder = builder.suggestion(suggestion.to_string());
        }
        builder.build()
    }
}

/// Rank `candidates` by edit distance to `name`, keeping close matches.
///
/// Used for the `UnknownSymbol`/`UnknownMember` hint. Only names within
/// distance 2 (scaled up for long names) qualify, best match first.
pub fn nearest_matches<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let threshold = 2.max(name.len() / 4);
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = edit_distance(name, candidate);
            (distance <= threshold && distance < candidate.len()).then_some((distance, candidate))
        })
        .collect();
    scored.sort_by_key(|(distance, candidate)| (*distance, candidate.to_string()));
    scored
        .into_iter()
        .take(3)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}

/// Levenshtein distance, case-insensitive.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().flat_map(|c| c.to_lowercase()).collect();
    let b: Vec<char> = b.chars().flat_map(|c| c.to_lowercase()).collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut previous_diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous_diagonal + usize::from(ca != cb);
            previous_diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(previous_diagonal + 1);
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_single_phrases() {
        let err = RuntimeError::new(
            RuntimeErrorKind::TypeMismatch {
                name: "color".to_string(),
                index: None,
                expected: "color".to_string(),
                got: "empty tuple".to_string(),
            },
            Span::new(0, 5),
        );
        assert_eq!(
            err.to_string(),
            "type mismatch for color: expected color, got empty tuple"
        );
        assert!(err.hint().is_none());
    }

    #[test]
    fn unknown_symbol_suggests_nearest() {
        let err = RuntimeError::new(
            RuntimeErrorKind::UnknownSymbol {
                name: "qube".to_string(),
                options: nearest_matches("qube", ["cube", "cone", "tube"]),
            },
            Span::new(0, 4),
        );
        assert_eq!(err.hint().as_deref(), Some("Did you mean 'cube'?"));
        assert_eq!(err.suggestion(), Some("cube"));
    }

    #[test]
    fn far_names_do_not_qualify() {
        assert!(nearest_matches("sphere", ["x", "intersection"]).is_empty());
        // A short name must not "match" by deleting all of it.
        assert!(nearest_matches("ab", ["x"]).is_empty());
    }

    #[test]
    fn enclosing_span_only_fills_dummies() {
        let anon = RuntimeError::new(RuntimeErrorKind::Cancelled, Span::DUMMY);
        assert_eq!(anon.with_enclosing_span(Span::new(3, 9)).span, Span::new(3, 9));
        let placed = RuntimeError::new(RuntimeErrorKind::Cancelled, Span::new(1, 2));
        assert_eq!(placed.with_enclosing_span(Span::new(3, 9)).span, Span::new(1, 2));
    }

    #[test]
    fn diagnostics_carry_codes_and_hints() {
        let err = RuntimeError::new(
            RuntimeErrorKind::InvalidIndex { index: 1, count: 1 },
            Span::new(10, 11),
        );
        let diagnostic = err.to_diagnostic();
        assert_eq!(diagnostic.message, "index 1 out of bounds (0..1)");
        assert_eq!(
            diagnostic.code,
            Some(shape_util::diagnostic::E_RUNTIME_INVALID_INDEX)
        );
        assert_eq!(diagnostic.span, Span::new(10, 11));
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("cube", "cube"), 0);
        assert_eq!(edit_distance("qube", "cube"), 1);
        assert_eq!(edit_distance("Color", "color"), 0);
        assert_eq!(edit_distance("ab", "ba"), 2);
    }
}
