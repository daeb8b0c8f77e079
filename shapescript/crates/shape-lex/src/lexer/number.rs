//! Number literal lexing.
//!
//! Numbers are always doubles: digits with an optional leading or trailing
//! decimal point. A second decimal point inside one literal is an error,
//! but `5.a` is not a malformed number, it is the number `5` followed by a
//! member access.

use crate::token::{Token, TokenKind};
use crate::{LexError, LexErrorKind};

use super::core::Lexer;

impl<'a> Lexer<'a> {
    /// Lex a number starting at the current cursor position, which is
    /// either a digit or a `.` glued to a digit.
    pub(crate) fn lex_number(&mut self, glued: bool) -> Result<Token, LexError> {
        if self.cursor.current_char() == '.' {
            // Leading decimal point: .5
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        } else {
            self.cursor.eat_while(|c| c.is_ascii_digit());
            if self.cursor.current_char() == '.' {
                let after_dot = self.cursor.char_at(1);
                if after_dot.is_ascii_digit() {
                    self.cursor.advance();
                    self.cursor.eat_while(|c| c.is_ascii_digit());
                } else if !after_dot.is_ascii_alphabetic() {
                    // Trailing decimal point: "5." is the number 5.
                    self.cursor.advance();
                }
                // Otherwise leave the dot alone: 5.a is a member access.
            }
        }

        // A further decimal point glued to a digit means the author wrote
        // something like 1.2.3: report the whole run as one bad literal.
        if self.cursor.current_char() == '.' && self.cursor.char_at(1).is_ascii_digit() {
            self.cursor.eat_while(|c| c.is_ascii_digit() || c == '.');
            let text = self.cursor.slice_from(self.token_start).to_string();
            return Err(LexError::new(
                LexErrorKind::InvalidNumber(text),
                self.token_span(),
            ));
        }

        let text = self.cursor.slice_from(self.token_start);
        let value: f64 = text.parse().map_err(|_| {
            LexError::new(
                LexErrorKind::InvalidNumber(text.to_string()),
                self.token_span(),
            )
        })?;
        Ok(self.make(TokenKind::Number(value), glued))
    }
}

#[cfg(test)]
mod tests {
    use crate::token::TokenKind;
    use crate::{tokenize, LexErrorKind};
    use shape_util::span::FileId;

    fn first_kind(source: &str) -> TokenKind {
        tokenize(source, FileId::DUMMY).unwrap().remove(0).kind
    }

    #[test]
    fn plain_integers_and_decimals() {
        assert_eq!(first_kind("42"), TokenKind::Number(42.0));
        assert_eq!(first_kind("1.5"), TokenKind::Number(1.5));
    }

    #[test]
    fn leading_and_trailing_points() {
        assert_eq!(first_kind(".5"), TokenKind::Number(0.5));
        assert_eq!(first_kind("5."), TokenKind::Number(5.0));
    }

    #[test]
    fn multiple_points_rejected() {
        let err = tokenize("1.2.3", FileId::DUMMY).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidNumber("1.2.3".to_string()));
        assert_eq!(err.span.start, 0);
        assert_eq!(err.span.end, 5);
    }

    #[test]
    fn number_followed_by_member() {
        let tokens = tokenize("5.x", FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number(5.0));
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }
}
