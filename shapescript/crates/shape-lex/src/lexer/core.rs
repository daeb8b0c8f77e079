//! Core lexer implementation: state, trivia, and token dispatch.

use std::collections::VecDeque;

use shape_util::span::{FileId, Span};

use crate::cursor::Cursor;
use crate::token::{InfixOp, PrefixOp, Token, TokenKind};
use crate::{LexError, LexErrorKind};

/// The kind of the previously emitted token, reduced to what the
/// context-sensitive rules need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LastToken {
    /// Start of input, nothing emitted yet.
    Start,
    /// An opening parenthesis.
    LParen,
    /// A prefix or infix operator.
    Operator,
    /// A line break (or comma).
    Linebreak,
    /// Anything else.
    Other,
}

/// What `skip_trivia` consumed.
pub(crate) struct Trivia {
    /// Whether any whitespace or comment characters were skipped.
    pub any: bool,
    /// Byte offset of the first line break skipped, if any.
    pub newline: Option<usize>,
}

/// Lexer for ShapeScript source text.
///
/// Produces one token per [`Lexer::next_token`] call, ending with
/// [`TokenKind::Eof`]. The lexer is fallible: the first error aborts the
/// token stream.
pub struct Lexer<'a> {
    pub(crate) cursor: Cursor<'a>,
    pub(crate) file_id: FileId,
    /// Tokens synthesised ahead of the cursor (phantom parentheses).
    pub(crate) pending: VecDeque<Token>,
    /// Reduced kind of the last token handed out.
    pub(crate) last: LastToken,
    /// Start offset of the token currently being lexed.
    pub(crate) token_start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over `source`.
    pub fn new(source: &'a str, file_id: FileId) -> Self {
        Self {
            cursor: Cursor::new(source),
            file_id,
            pending: VecDeque::new(),
            last: LastToken::Start,
            token_start: 0,
        }
    }

    /// Returns the next token from the source code.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(token) = self.pending.pop_front() {
            self.note_emitted(&token.kind);
            return Ok(token);
        }

        loop {
            let trivia = self.skip_trivia();
            self.token_start = self.cursor.position();

            // A skipped line break becomes a single Linebreak token, unless
            // the previous token already was one (runs collapse) or we are
            // at the very start of the file.
            if let Some(newline) = trivia.newline {
                if !matches!(self.last, LastToken::Start | LastToken::Linebreak) {
                    let token = Token::new(
                        TokenKind::Linebreak,
                        self.span_at(newline, newline + 1),
                        false,
                    );
                    self.note_emitted(&token.kind);
                    return Ok(token);
                }
            }

            if self.cursor.is_at_end() {
                let here = self.cursor.position();
                let token = Token::new(TokenKind::Eof, self.span_at(here, here), false);
                return Ok(token);
            }

            let glued = !trivia.any
                && !matches!(self.last, LastToken::Start | LastToken::Linebreak);

            let token = match self.cursor.current_char() {
                '(' => self.punct(TokenKind::LParen, glued),
                ')' => self.punct(TokenKind::RParen, glued),
                '{' => self.punct(TokenKind::LBrace, glued),
                '}' => self.punct(TokenKind::RBrace, glued),
                '[' => self.punct(TokenKind::LBracket, glued),
                ']' => self.punct(TokenKind::RBracket, glued),
                ',' | ';' => {
                    // A comma or semicolon separates like a line break;
                    // runs collapse.
                    self.cursor.advance();
                    if self.last == LastToken::Linebreak {
                        continue;
                    }
                    Token::new(
                        TokenKind::Linebreak,
                        self.span_at(self.token_start, self.cursor.position()),
                        false,
                    )
                }
                '.' => self.lex_dot(glued)?,
                '"' => self.lex_string(glued)?,
                '#' => self.lex_hex_color(glued)?,
                '+' | '-' => self.lex_sign(trivia.any, glued),
                '*' => {
                    self.cursor.advance();
                    self.make(TokenKind::Infix(InfixOp::Mul), glued)
                }
                '/' => {
                    self.cursor.advance();
                    self.make(TokenKind::Infix(InfixOp::Div), glued)
                }
                '=' | '<' | '>' | '!' | '&' | '|' => self.lex_operator(glued)?,
                c if c.is_ascii_digit() => self.lex_number(glued)?,
                c if c.is_ascii_alphabetic() => self.lex_identifier(glued)?,
                _ => return Err(self.unexpected_run()),
            };

            self.note_emitted(&token.kind);
            return Ok(token);
        }
    }

    /// `.` is a member operator only when glued to an identifier on the
    /// right and a non-operator token on the left. `.5` starts a number.
    fn lex_dot(&mut self, glued: bool) -> Result<Token, LexError> {
        if self.cursor.char_at(1).is_ascii_digit() {
            return self.lex_number(glued);
        }
        if glued
            && self.last != LastToken::Operator
            && self.cursor.char_at(1).is_ascii_alphabetic()
        {
            self.cursor.advance();
            return Ok(self.make(TokenKind::Dot, glued));
        }
        self.cursor.advance();
        Err(LexError::new(
            LexErrorKind::UnexpectedToken(".".to_string()),
            self.token_span(),
        ))
    }

    /// Classify `+`/`-`: prefix when preceded by whitespace and glued to a
    /// digit, or at the start of a parenthesised group; infix otherwise.
    fn lex_sign(&mut self, had_space: bool, glued: bool) -> Token {
        let ch = self.cursor.advance();
        let next = self.cursor.current_char();
        let digit_follows = next.is_ascii_digit() || (next == '.' && self.cursor.char_at(1).is_ascii_digit());
        let preceded_by_break = had_space
            || matches!(self.last, LastToken::Start | LastToken::Linebreak | LastToken::Operator);
        let prefix = (preceded_by_break && digit_follows) || self.last == LastToken::LParen;
        let kind = match (ch, prefix) {
            ('-', true) => TokenKind::Prefix(PrefixOp::Minus),
            ('-', false) => TokenKind::Infix(InfixOp::Sub),
            (_, true) => TokenKind::Prefix(PrefixOp::Plus),
            (_, false) => TokenKind::Infix(InfixOp::Add),
        };
        self.make(kind, glued)
    }

    /// Consume an unexpected character and any identifier-like run glued
    /// to it, e.g. `$4b`.
    pub(crate) fn unexpected_run(&mut self) -> LexError {
        self.cursor.advance();
        self.cursor
            .eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let text = self.cursor.slice_from(self.token_start).to_string();
        LexError::new(LexErrorKind::UnexpectedToken(text), self.token_span())
    }

    /// Skip whitespace and comments, recording what was consumed.
    ///
    /// Comments never produce tokens, but line breaks inside them are
    /// preserved so statement separation and line numbers stay stable.
    fn skip_trivia(&mut self) -> Trivia {
        let start = self.cursor.position();
        let mut newline = None;
        loop {
            match self.cursor.current_char() {
                ' ' | '\t' => {
                    self.cursor.advance();
                }
                '\r' => {
                    let at = self.cursor.position();
                    self.cursor.advance();
                    // CRLF counts as a single line break.
                    self.cursor.eat('\n');
                    newline.get_or_insert(at);
                }
                '\n' => {
                    let at = self.cursor.position();
                    self.cursor.advance();
                    newline.get_or_insert(at);
                }
                '/' if self.cursor.char_at(1) == '/' => {
                    self.cursor
                        .eat_while(|c| c != '\n' && c != '\r');
                }
                '/' if self.cursor.char_at(1) == '*' => {
                    if let Some(at) = self.skip_block_comment() {
                        newline.get_or_insert(at);
                    }
                }
                _ => break,
            }
        }
        Trivia {
            any: self.cursor.position() > start,
            newline,
        }
    }

    /// Skip a nestable `/* ... */` comment, returning the offset of the
    /// first line break inside it, if any. An unterminated comment simply
    /// runs to end of file.
    fn skip_block_comment(&mut self) -> Option<usize> {
        debug_assert_eq!(self.cursor.current_char(), '/');
        self.cursor.advance();
        self.cursor.advance();
        let mut depth = 1usize;
        let mut newline = None;
        while depth > 0 && !self.cursor.is_at_end() {
            match self.cursor.current_char() {
                '*' if self.cursor.char_at(1) == '/' => {
                    self.cursor.advance();
                    self.cursor.advance();
                    depth -= 1;
                }
                '/' if self.cursor.char_at(1) == '*' => {
                    self.cursor.advance();
                    self.cursor.advance();
                    depth += 1;
                }
                '\n' | '\r' => {
                    newline.get_or_insert(self.cursor.position());
                    self.cursor.advance();
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
        newline
    }

    /// A single-character punctuation token.
    fn punct(&mut self, kind: TokenKind, glued: bool) -> Token {
        self.cursor.advance();
        self.make(kind, glued)
    }

    /// Build a token spanning from `token_start` to the cursor.
    pub(crate) fn make(&self, kind: TokenKind, glued: bool) -> Token {
        Token::new(kind, self.token_span(), glued)
    }

    /// The span from `token_start` to the current cursor position.
    pub(crate) fn token_span(&self) -> Span {
        self.span_at(self.token_start, self.cursor.position())
    }

    pub(crate) fn span_at(&self, start: usize, end: usize) -> Span {
        Span::with_file(start, end, self.file_id)
    }

    /// Record the reduced kind of an emitted token for the context rules.
    fn note_emitted(&mut self, kind: &TokenKind) {
        self.last = match kind {
            TokenKind::LParen => LastToken::LParen,
            TokenKind::Prefix(_) | TokenKind::Infix(_) => LastToken::Operator,
            TokenKind::Linebreak => LastToken::Linebreak,
            _ => LastToken::Other,
        };
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) if token.is_eof() => None,
            other => Some(other),
        }
    }
}
