//! Hex colour literal lexing.
//!
//! `#` followed by 3 (rgb), 4 (rgba), 6 (rrggbb), or 8 (rrggbbaa) hex
//! digits. Any other digit count is an invalid colour.

use crate::token::{Token, TokenKind};
use crate::{LexError, LexErrorKind};

use super::core::Lexer;

impl<'a> Lexer<'a> {
    /// Lex a hex colour starting at the `#`.
    pub(crate) fn lex_hex_color(&mut self, glued: bool) -> Result<Token, LexError> {
        self.cursor.advance();
        let digits_start = self.cursor.position();
        self.cursor.eat_while(|c| c.is_ascii_hexdigit());

        // A non-hex word character glued to the digits makes the whole run
        // one bad literal (#12fg), not a colour followed by an identifier.
        if self.cursor.current_char().is_ascii_alphanumeric() {
            self.cursor
                .eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let text = self.cursor.slice_from(digits_start).to_string();
            return Err(LexError::new(
                LexErrorKind::InvalidColor(text),
                self.token_span(),
            ));
        }

        let digits = self.cursor.slice_from(digits_start);
        match digits.len() {
            3 | 4 | 6 | 8 => Ok(self.make(TokenKind::HexColor(digits.to_string()), glued)),
            _ => Err(LexError::new(
                LexErrorKind::InvalidColor(digits.to_string()),
                self.token_span(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::TokenKind;
    use crate::{tokenize, LexErrorKind};
    use shape_util::span::FileId;

    #[test]
    fn valid_digit_counts() {
        for digits in ["f00", "f00c", "ff0000", "ff0000cc"] {
            let source = format!("#{}", digits);
            let tokens = tokenize(&source, FileId::DUMMY).unwrap();
            assert_eq!(tokens[0].kind, TokenKind::HexColor(digits.to_string()));
        }
    }

    #[test]
    fn wrong_digit_counts_rejected() {
        for digits in ["f", "f0", "f0000", "f000000", "f00000000"] {
            let source = format!("#{}", digits);
            let err = tokenize(&source, FileId::DUMMY).unwrap_err();
            assert_eq!(err.kind, LexErrorKind::InvalidColor(digits.to_string()));
        }
    }

    #[test]
    fn non_hex_letters_rejected() {
        let err = tokenize("#12fg", FileId::DUMMY).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidColor("12fg".to_string()));
    }

    #[test]
    fn span_includes_the_hash() {
        let err = tokenize("  #ab", FileId::DUMMY).unwrap_err();
        assert_eq!(err.span.start, 2);
        assert_eq!(err.span.end, 5);
    }
}
