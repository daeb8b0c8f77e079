//! String literal lexing.
//!
//! Strings are double-quoted with exactly three escapes: `\"`, `\\`, and
//! `\n`. Anything else after a backslash is an invalid escape sequence,
//! reported with the intended form when one exists. A doubled quote is the
//! most common of these mistakes (CSV-style escaping) and gets its own
//! detection so the suggestion can say `\"`.

use crate::token::{Token, TokenKind};
use crate::{LexError, LexErrorKind};

use super::core::Lexer;

impl<'a> Lexer<'a> {
    /// Lex a string literal starting at the opening quote.
    pub(crate) fn lex_string(&mut self, glued: bool) -> Result<Token, LexError> {
        let open = self.cursor.position();
        self.cursor.advance();

        // `""` glued to further content means the author tried to escape a
        // quote by doubling it.
        if self.cursor.current_char() == '"' {
            let after = self.cursor.char_at(1);
            if after.is_ascii_alphanumeric() || after == '"' {
                return Err(self.doubled_quote_error(open));
            }
        }

        let mut decoded = String::new();
        loop {
            match self.cursor.current_char() {
                '\0' if self.cursor.is_at_end() => {
                    return Err(self.unterminated(open));
                }
                '\n' | '\r' => {
                    return Err(self.unterminated(open));
                }
                '\\' => {
                    self.cursor.advance();
                    let escaped = self.cursor.current_char();
                    match escaped {
                        '"' => decoded.push('"'),
                        '\\' => decoded.push('\\'),
                        'n' => decoded.push('\n'),
                        '\0' if self.cursor.is_at_end() => {
                            // Trailing backslash is never a half-escape.
                            return Err(self.unterminated(open));
                        }
                        '\n' | '\r' => {
                            return Err(self.unterminated(open));
                        }
                        other => {
                            let start = self.cursor.position() - 1;
                            self.cursor.advance();
                            let text = format!("\\{}", other);
                            let mut err = LexError::new(
                                LexErrorKind::InvalidEscapeSequence(text),
                                self.span_at(start, self.cursor.position()),
                            );
                            if let Some(intended) = intended_form(other) {
                                err = err.with_suggestion(intended);
                            }
                            return Err(err);
                        }
                    }
                    self.cursor.advance();
                }
                '"' => {
                    let close = self.cursor.position();
                    self.cursor.advance();
                    // A quote glued to the closing quote is the doubled
                    // form again: "a""b".
                    if self.cursor.current_char() == '"' {
                        return Err(self.doubled_quote_error(close));
                    }
                    return Ok(self.make(TokenKind::String(decoded), glued));
                }
                c => {
                    decoded.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    fn doubled_quote_error(&mut self, at: usize) -> LexError {
        self.cursor.advance();
        LexError::new(
            LexErrorKind::InvalidEscapeSequence("\"\"".to_string()),
            self.span_at(at, at + 2),
        )
        .with_suggestion("\\\"")
    }

    /// Range starts at the opening quote and ends before the line break or
    /// end of file.
    fn unterminated(&self, open: usize) -> LexError {
        LexError::new(
            LexErrorKind::UnterminatedString,
            self.span_at(open, self.cursor.position()),
        )
    }
}

/// The form the author probably intended for an unrecognised escape.
fn intended_form(escaped: char) -> Option<&'static str> {
    match escaped {
        '\'' => Some("'"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::token::TokenKind;
    use crate::{tokenize, LexErrorKind};
    use shape_util::span::FileId;

    #[test]
    fn decodes_escapes() {
        let tokens = tokenize("\"a\\\"b\\\\c\\nd\"", FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("a\"b\\c\nd".to_string()));
    }

    #[test]
    fn invalid_escape_reports_sequence() {
        let err = tokenize("\"bad\\r\"", FileId::DUMMY).unwrap_err();
        assert_eq!(
            err.kind,
            LexErrorKind::InvalidEscapeSequence("\\r".to_string())
        );
        assert!(err.suggestion.is_none());
    }

    #[test]
    fn escaped_apostrophe_suggests_plain() {
        let err = tokenize("\"don\\'t\"", FileId::DUMMY).unwrap_err();
        assert_eq!(err.suggestion.as_deref(), Some("'"));
    }

    #[test]
    fn unterminated_at_eol() {
        let err = tokenize("\"open\nrest", FileId::DUMMY).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        // Range starts at the quote and ends before the line break.
        assert_eq!(err.span.start, 0);
        assert_eq!(err.span.end, 5);
    }

    #[test]
    fn unterminated_at_eof() {
        let err = tokenize("\"open", FileId::DUMMY).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn trailing_backslash_is_unterminated() {
        let err = tokenize("\"oops\\", FileId::DUMMY).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn empty_string_is_fine_when_delimited() {
        let tokens = tokenize("print \"\"", FileId::DUMMY).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::String(String::new()));
    }
}
