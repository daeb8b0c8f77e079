//! Punctuation operator lexing.
//!
//! ShapeScript spells equality `=` and inequality `<>`. The C-family
//! spellings are recognised just enough to reject them with the right
//! correction.

use crate::token::{InfixOp, Token, TokenKind};
use crate::{LexError, LexErrorKind};

use super::core::Lexer;

impl<'a> Lexer<'a> {
    /// Lex an operator starting with `=`, `<`, `>`, `!`, `&`, or `|`.
    pub(crate) fn lex_operator(&mut self, glued: bool) -> Result<Token, LexError> {
        let first = self.cursor.advance();
        let kind = match first {
            '=' => {
                if self.cursor.eat('=') {
                    return Err(self.misspelled_operator("==", "="));
                }
                if self.cursor.eat('>') {
                    return Err(self.misspelled_operator("=>", ">="));
                }
                TokenKind::Infix(InfixOp::Equal)
            }
            '<' => {
                if self.cursor.eat('>') {
                    TokenKind::Infix(InfixOp::NotEqual)
                } else if self.cursor.eat('=') {
                    TokenKind::Infix(InfixOp::LessEqual)
                } else {
                    TokenKind::Infix(InfixOp::Less)
                }
            }
            '>' => {
                if self.cursor.eat('=') {
                    TokenKind::Infix(InfixOp::GreaterEqual)
                } else {
                    TokenKind::Infix(InfixOp::Greater)
                }
            }
            '!' => {
                if self.cursor.eat('=') {
                    return Err(self.misspelled_operator("!=", "<>"));
                }
                return Err(self.misspelled_operator("!", "not"));
            }
            '&' => {
                if self.cursor.eat('&') {
                    return Err(self.misspelled_operator("&&", "and"));
                }
                return Err(self.misspelled_operator("&", "and"));
            }
            '|' => {
                if self.cursor.eat('|') {
                    return Err(self.misspelled_operator("||", "or"));
                }
                return Err(self.misspelled_operator("|", "or"));
            }
            other => {
                // Unreachable from the dispatch, but be safe.
                return Err(LexError::new(
                    LexErrorKind::UnexpectedToken(other.to_string()),
                    self.token_span(),
                ));
            }
        };
        Ok(self.make(kind, glued))
    }

    fn misspelled_operator(&self, found: &str, intended: &str) -> LexError {
        LexError::new(
            LexErrorKind::UnexpectedToken(found.to_string()),
            self.token_span(),
        )
        .with_suggestion(intended)
    }
}

#[cfg(test)]
mod tests {
    use crate::token::{InfixOp, TokenKind};
    use crate::tokenize;
    use shape_util::span::FileId;

    #[test]
    fn comparison_operators() {
        let tokens = tokenize("a < b <= c > d >= e", FileId::DUMMY).unwrap();
        let ops: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Infix(op) => Some(op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                InfixOp::Less,
                InfixOp::LessEqual,
                InfixOp::Greater,
                InfixOp::GreaterEqual
            ]
        );
    }

    #[test]
    fn equality_spellings() {
        let tokens = tokenize("a = b <> c", FileId::DUMMY).unwrap();
        let ops: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Infix(op) => Some(op),
                _ => None,
            })
            .collect();
        assert_eq!(ops, vec![InfixOp::Equal, InfixOp::NotEqual]);
    }

    #[test]
    fn misspelling_span_covers_operator() {
        let err = tokenize("a == b", FileId::DUMMY).unwrap_err();
        assert_eq!(err.span.start, 2);
        assert_eq!(err.span.end, 4);
    }
}
