//! Identifier, keyword, and word-operator lexing, plus the phantom
//! parenthesis rule.
//!
//! Identifiers match `[A-Za-z][A-Za-z0-9_]*`. A leading underscore is
//! rejected in the core dispatch before we get here.
//!
//! The phantom parenthesis rule: when an identifier is glued to a `(` and
//! the token before the identifier was an operator, the identifier is
//! wrapped in synthesised zero-width parentheses. `-a(b)` then tokenises
//! as `- ( a ) ( b )`, which can never parse as a call of `a`.

use shape_util::symbol::Symbol;

use crate::token::{InfixOp, Keyword, PrefixOp, Token, TokenKind};
use crate::LexError;

use super::core::{LastToken, Lexer};

impl<'a> Lexer<'a> {
    /// Lex an identifier-shaped token: keyword, word operator, or name.
    pub(crate) fn lex_identifier(&mut self, glued: bool) -> Result<Token, LexError> {
        self.cursor
            .eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let text = self.cursor.slice_from(self.token_start);

        if let Some(keyword) = Keyword::from_str(text) {
            return Ok(self.make(TokenKind::Keyword(keyword), glued));
        }
        if let Some(kind) = word_operator(text) {
            return Ok(self.make(kind, glued));
        }

        let symbol = Symbol::intern(text);
        let span = self.token_span();

        if self.cursor.current_char() == '(' && self.last == LastToken::Operator {
            // Phantom parentheses around the identifier; the real `(`
            // lexes on its own afterwards.
            let open = Token::new(TokenKind::LParen, self.span_at(span.start, span.start), glued);
            self.pending
                .push_back(Token::new(TokenKind::Identifier(symbol), span, true));
            self.pending
                .push_back(Token::new(TokenKind::RParen, self.span_at(span.end, span.end), true));
            return Ok(open);
        }

        Ok(Token::new(TokenKind::Identifier(symbol), span, glued))
    }
}

/// Operators spelled as words.
fn word_operator(text: &str) -> Option<TokenKind> {
    match text {
        "and" => Some(TokenKind::Infix(InfixOp::And)),
        "or" => Some(TokenKind::Infix(InfixOp::Or)),
        "not" => Some(TokenKind::Prefix(PrefixOp::Not)),
        "to" => Some(TokenKind::Infix(InfixOp::To)),
        "step" => Some(TokenKind::Infix(InfixOp::Step)),
        "in" => Some(TokenKind::Infix(InfixOp::In)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::token::TokenKind;
    use crate::{tokenize, LexErrorKind};
    use shape_util::span::FileId;
    use shape_util::symbol::Symbol;

    #[test]
    fn identifiers_allow_inner_underscores_and_digits() {
        let tokens = tokenize("leg_2", FileId::DUMMY).unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Identifier(Symbol::intern("leg_2"))
        );
    }

    #[test]
    fn leading_underscore_rejected() {
        let err = tokenize("_private", FileId::DUMMY).unwrap_err();
        assert_eq!(
            err.kind,
            LexErrorKind::UnexpectedToken("_private".to_string())
        );
    }

    #[test]
    fn phantom_parens_only_after_operators() {
        // Glued call with no operator before it stays a plain identifier
        // followed by a parenthesis.
        let tokens = tokenize("cos(1)", FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier(Symbol::intern("cos")));
        assert_eq!(tokens[1].kind, TokenKind::LParen);
        assert!(tokens[1].glued);
    }

    #[test]
    fn phantom_parens_are_zero_width() {
        let tokens = tokenize("1 * a(2)", FileId::DUMMY).unwrap();
        // 1, *, phantom (, a, phantom ), (, 2, ), eof
        assert_eq!(tokens[2].kind, TokenKind::LParen);
        assert!(tokens[2].span.is_empty());
        assert_eq!(tokens[4].kind, TokenKind::RParen);
        assert!(tokens[4].span.is_empty());
        assert_eq!(tokens[5].kind, TokenKind::LParen);
        assert!(!tokens[5].span.is_empty());
    }
}
