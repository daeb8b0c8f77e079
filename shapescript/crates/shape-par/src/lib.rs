//! shape-par - The ShapeScript parser.
//!
//! A single-pass recursive-descent parser with Pratt-style operator
//! precedence for infix expressions. Consumes the token stream from
//! `shape-lex` (including its phantom parentheses, which arrive as
//! ordinary tokens) and produces a [`Program`].
//!
//! The grammar is line-oriented: statements are separated by line breaks
//! (or commas), and a bare `NAME EXPR ...` line is always parsed as a
//! command whose argument is the juxtaposed operand tuple; whether the
//! name is a setter, a user block, or a plain value is resolved later by
//! the evaluator's symbol table.
//!
//! A single syntax error aborts parsing.

pub mod ast;
mod expr;
mod stmt;

pub use ast::{
    Block, CaseClause, Definition, Expression, ExpressionKind, Identifier, Program, Statement,
    StatementKind,
};
pub use expr::bp;

use std::sync::Arc;

use shape_lex::{tokenize, LexError, Token, TokenKind};
use shape_util::diagnostic::{Diagnostic, DiagnosticBuilder, E_PARSE_UNEXPECTED_TOKEN};
use shape_util::span::{FileId, Span};
use thiserror::Error;

/// A syntax error: the offending token plus what was expected there.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("unexpected token {}", .token.kind.describe())]
pub struct ParseError {
    /// The token that could not be consumed.
    pub token: Token,
    /// A short noun phrase, used verbatim in the hint: "Expected {phrase}."
    pub expected: Option<&'static str>,
    /// Deterministic replacement text for known misspellings.
    pub suggestion: Option<String>,
}

impl ParseError {
    pub fn new(token: Token, expected: Option<&'static str>) -> Self {
        Self {
            token,
            expected,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// The source range of the offending token.
    pub fn span(&self) -> Span {
        self.token.span
    }

    /// The imperative hint sentence, if any.
    pub fn hint(&self) -> Option<String> {
        if let Some(suggestion) = &self.suggestion {
            return Some(format!("Did you mean '{}'?", suggestion));
        }
        self.expected.map(|phrase| format!("Expected {}.", phrase))
    }

    /// Render as a diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = DiagnosticBuilder::error(self.to_string())
            .code(E_PARSE_UNEXPECTED_TOKEN)
            .span(self.span());
        if let Some(hint) = self.hint() {
            builder = builder.hint(hint);
        }
        if let Some(suggestion) = &self.suggestion {
            builder = builder.suggestion(suggestion.clone());
        }
        builder.build()
    }
}

/// Either phase of syntax analysis can fail; callers that go straight from
/// source to AST get both through one type.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    /// The source range of the error.
    pub fn span(&self) -> Span {
        match self {
            SyntaxError::Lex(err) => err.span,
            SyntaxError::Parse(err) => err.span(),
        }
    }

    /// Render as a diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            SyntaxError::Lex(err) => err.to_diagnostic(),
            SyntaxError::Parse(err) => err.to_diagnostic(),
        }
    }
}

/// Parse a source string into a [`Program`].
pub fn parse_source(source: &str, file_id: FileId) -> Result<Program, SyntaxError> {
    let tokens = tokenize(source, file_id)?;
    let program = parse_tokens(tokens, source, file_id)?;
    Ok(program)
}

/// Parse a pre-lexed token stream into a [`Program`].
pub fn parse_tokens(
    tokens: Vec<Token>,
    source: &str,
    file_id: FileId,
) -> Result<Program, ParseError> {
    let mut parser = Parser::new(tokens, file_id);
    let statements = parser.parse_statements_until(|kind| matches!(kind, TokenKind::Eof))?;
    Ok(Program {
        statements,
        source: Arc::from(source),
        file_id,
    })
}

/// Recursive-descent parser over a token buffer.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file_id: FileId,
    /// When true, `NAME {` does not start a block invocation. Set while
    /// parsing `if`/`for`/`switch` heads, where the brace belongs to the
    /// statement body.
    pub(crate) no_block: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file_id: FileId) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            pos: 0,
            file_id,
            no_block: false,
        }
    }

    /// The current token.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// The token `n` positions ahead.
    pub(crate) fn peek_ahead(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    /// Consume and return the current token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it matches.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Save and restore points for bounded lookahead.
    pub(crate) fn snapshot(&self) -> usize {
        self.pos
    }

    pub(crate) fn rewind(&mut self, snapshot: usize) {
        self.pos = snapshot;
    }

    /// Skip any run of line breaks.
    pub(crate) fn skip_linebreaks(&mut self) {
        while matches!(self.peek().kind, TokenKind::Linebreak) {
            self.advance();
        }
    }

    /// Build an error at the current token.
    pub(crate) fn unexpected(&self, expected: Option<&'static str>) -> ParseError {
        ParseError::new(self.peek().clone(), expected)
    }

    /// Consume a token of the given kind or fail with the expectation.
    pub(crate) fn expect(
        &mut self,
        kind: &TokenKind,
        expected: &'static str,
    ) -> Result<Token, ParseError> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(Some(expected)))
        }
    }

    pub(crate) fn file_id(&self) -> FileId {
        self.file_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_hint_uses_expected_phrase() {
        let err = parse_source("for { }", FileId::DUMMY).unwrap_err();
        match err {
            SyntaxError::Parse(err) => {
                assert_eq!(err.hint().as_deref(), Some("Expected range."));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn lex_errors_pass_through() {
        let err = parse_source("a == b", FileId::DUMMY).unwrap_err();
        assert!(matches!(err, SyntaxError::Lex(_)));
        assert_eq!(err.span(), Span::new(2, 4));
    }

    #[test]
    fn empty_program_parses() {
        let program = parse_source("", FileId::DUMMY).unwrap();
        assert!(program.statements.is_empty());
        let program = parse_source("\n\n  \n", FileId::DUMMY).unwrap();
        assert!(program.statements.is_empty());
    }

    #[test]
    fn round_trip_is_stable() {
        let source = "define wheel {\n    cylinder { size 1 0.2 }\n}\nfor i in 1 to 4 {\n    wheel { position i }\n}\n";
        let first = parse_source(source, FileId::DUMMY).unwrap();
        let second = parse_source(source, FileId::DUMMY).unwrap();
        assert_eq!(first, second);
    }
}
