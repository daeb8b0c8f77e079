//! shape-lex - The ShapeScript lexer.
//!
//! Transforms UTF-8 source text into a stream of [`Token`]s with byte-range
//! spans. The grammar is whitespace-sensitive in a few deliberate places,
//! so the lexer does more contextual work than most:
//!
//! - `-` and `+` are classified prefix or infix from surrounding space
//!   (`a -1` is two values, `a - 1` is a subtraction).
//! - `IDENT(` glued directly after an operator is wrapped in phantom
//!   parentheses so it can never parse as a function call.
//! - `.` is a member operator only when glued to an identifier on the
//!   right and a non-operator token on the left.
//! - Commas, semicolons, and line-break runs collapse into a single
//!   [`TokenKind::Linebreak`].
//!
//! A single lexical error aborts tokenisation; the error carries the
//! offending range and, for recognisable misspellings (`&&`, `!=`, `==`),
//! a deterministic replacement suggestion.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use lexer::Lexer;
pub use token::{InfixOp, Keyword, PrefixOp, Token, TokenKind};

use shape_util::diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode};
use shape_util::span::{FileId, Span};
use thiserror::Error;

/// The kinds of lexical error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// A character sequence that is not part of the language.
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    /// A malformed numeric literal, e.g. `1.2.3`.
    #[error("invalid numeric literal '{0}'")]
    InvalidNumber(String),
    /// A hex colour with a digit count other than 3, 4, 6, or 8.
    #[error("invalid color literal '#{0}'")]
    InvalidColor(String),
    /// An unrecognised escape inside a string literal.
    #[error("invalid escape sequence '{0}'")]
    InvalidEscapeSequence(String),
    /// A string literal with no closing quote before end of line or file.
    #[error("unterminated string literal")]
    UnterminatedString,
}

impl LexErrorKind {
    /// The stable diagnostic code for this error kind.
    pub fn code(&self) -> DiagnosticCode {
        use shape_util::diagnostic as d;
        match self {
            LexErrorKind::UnexpectedToken(_) => d::E_LEX_UNEXPECTED_TOKEN,
            LexErrorKind::InvalidNumber(_) => d::E_LEX_INVALID_NUMBER,
            LexErrorKind::InvalidColor(_) => d::E_LEX_INVALID_COLOR,
            LexErrorKind::InvalidEscapeSequence(_) => d::E_LEX_INVALID_ESCAPE,
            LexErrorKind::UnterminatedString => d::E_LEX_UNTERMINATED_STRING,
        }
    }
}

/// A lexical error with its source range and optional correction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
    /// Deterministic replacement text, when the mistake is a known one.
    pub suggestion: Option<String>,
}

impl LexError {
    pub fn new(kind: LexErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// An imperative hint derived from the suggestion, if any.
    pub fn hint(&self) -> Option<String> {
        self.suggestion
            .as_ref()
            .map(|s| format!("Did you mean '{}'?", s))
    }

    /// Render as a diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = DiagnosticBuilder::error(self.kind.to_string())
            .code(self.kind.code())
            .span(self.span);
        if let Some(hint) = self.hint() {
            builder = builder.hint(hint);
        }
        if let Some(suggestion) = &self.suggestion {
            builder = builder.suggestion(suggestion.clone());
        }
        builder.build()
    }
}

/// Tokenise an entire source string.
///
/// Returns the token vector terminated by [`TokenKind::Eof`], or the first
/// lexical error.
pub fn tokenize(source: &str, file_id: FileId) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source, file_id);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.is_eof();
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
