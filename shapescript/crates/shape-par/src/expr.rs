//! Expression parsing using Pratt-style operator precedence.
//!
//! # Operator precedence (lowest to highest)
//!
//! | Tier | Operators | Associativity |
//! |------|-----------|---------------|
//! | 1 | `or` | Left |
//! | 2 | `and` | Left |
//! | 3 | `in` | Left |
//! | 4 | `=`, `<>` | None (chaining is an error) |
//! | 5 | `<`, `<=`, `>`, `>=` | None (chaining is an error) |
//! | 6 | `step` | Left (a second `step` is an error) |
//! | 7 | `to` | Left |
//! | 8 | `+`, `-` | Left |
//! | 9 | `*`, `/` | Left |
//! | 10 | unary `not`, `-`, `+` | Prefix |
//!
//! Juxtaposition sits below all of these: `print 1 + 2 3` is the command
//! `print` applied to the tuple `(3, 3)`. An operand glued to `(` after an
//! identifier binds tightly as an application, which is what makes
//! `cos(pi) + 1` read as `(cos pi) + 1`.

use shape_lex::{InfixOp, TokenKind};

use crate::ast::{Expression, ExpressionKind, Identifier};
use crate::{ParseError, Parser};

/// Binding power levels for Pratt parsing.
/// Higher numbers = tighter binding.
pub mod bp {
    /// Minimum binding power (start of expression).
    pub const MIN: u8 = 0;

    /// Logical OR: `or`
    pub const OR: u8 = 2;

    /// Logical AND: `and`
    pub const AND: u8 = 4;

    /// Membership: `in`
    pub const IN: u8 = 6;

    /// Equality: `=` `<>` (non-associative)
    pub const EQUALITY: u8 = 8;

    /// Comparison: `<` `<=` `>` `>=` (non-associative)
    pub const COMPARISON: u8 = 10;

    /// Range stride: `step`
    pub const STEP: u8 = 12;

    /// Range construction: `to`
    pub const TO: u8 = 14;

    /// Additive: `+` `-`
    pub const ADDITIVE: u8 = 16;

    /// Multiplicative: `*` `/`
    pub const MULTIPLICATIVE: u8 = 18;

    /// Unary operators.
    pub const UNARY: u8 = 20;
}

/// (left, right) binding powers; left-associative tiers bind the right
/// side one tighter.
fn infix_binding_power(op: InfixOp) -> (u8, u8) {
    let tier = match op {
        InfixOp::Or => bp::OR,
        InfixOp::And => bp::AND,
        InfixOp::In => bp::IN,
        InfixOp::Equal | InfixOp::NotEqual => bp::EQUALITY,
        InfixOp::Less | InfixOp::LessEqual | InfixOp::Greater | InfixOp::GreaterEqual => {
            bp::COMPARISON
        }
        InfixOp::Step => bp::STEP,
        InfixOp::To => bp::TO,
        InfixOp::Add | InfixOp::Sub => bp::ADDITIVE,
        InfixOp::Mul | InfixOp::Div => bp::MULTIPLICATIVE,
    };
    (tier, tier + 1)
}

impl Parser {
    /// Parse a full expression line: one or more juxtaposed operands.
    ///
    /// A single operand is returned as itself; several collapse into a
    /// [`ExpressionKind::Tuple`] in source order.
    pub(crate) fn parse_expression_line(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_expr(bp::MIN)?;
        if !self.starts_operand() {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.starts_operand() {
            elements.push(self.parse_expr(bp::MIN)?);
        }
        let span = elements[0].span.to(elements[elements.len() - 1].span);
        Ok(Expression::new(ExpressionKind::Tuple(elements), span))
    }

    /// Whether the current token can begin a new juxtaposed operand.
    pub(crate) fn starts_operand(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::HexColor(_)
            | TokenKind::Identifier(_)
            | TokenKind::LParen
            | TokenKind::Prefix(_) => true,
            _ => false,
        }
    }

    /// Pratt expression parser core.
    pub(crate) fn parse_expr(&mut self, min_bp: u8) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Infix(op) => op,
                _ => break,
            };
            let (lbp, rbp) = infix_binding_power(op);
            if lbp < min_bp {
                break;
            }
            let op_token = self.advance();

            // A second `step` on one range is always a mistake.
            if op == InfixOp::Step
                && matches!(lhs.kind, ExpressionKind::Infix(_, InfixOp::Step, _))
            {
                return Err(ParseError::new(op_token, None));
            }

            let rhs = self.parse_expr(rbp)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expression::new(
                ExpressionKind::Infix(Box::new(lhs), op, Box::new(rhs)),
                span,
            );

            // Comparison and equality do not chain: `1 < 2 < 3` errors on
            // the second `<`.
            if let TokenKind::Infix(next_op) = self.peek().kind {
                let chained = (op.is_comparison() && next_op.is_comparison())
                    || (op.is_equality() && next_op.is_equality());
                if chained {
                    return Err(self.unexpected(None));
                }
            }
        }

        Ok(lhs)
    }

    /// Parse a prefix expression: an atom, a unary operator, or a
    /// parenthesised group, followed by any postfix accessors.
    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        let base = match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Expression::new(ExpressionKind::Number(value), token.span)
            }
            TokenKind::String(ref text) => {
                let text = text.clone();
                self.advance();
                Expression::new(ExpressionKind::String(text), token.span)
            }
            TokenKind::HexColor(ref digits) => {
                let digits = digits.clone();
                self.advance();
                Expression::new(ExpressionKind::HexColor(digits), token.span)
            }
            TokenKind::Prefix(op) => {
                self.advance();
                let operand = self.parse_expr(bp::UNARY)?;
                let span = token.span.to(operand.span);
                return Ok(Expression::new(
                    ExpressionKind::Prefix(op, Box::new(operand)),
                    span,
                ));
            }
            // An infix `-`/`+` in operand position is unary: `print -x`.
            TokenKind::Infix(InfixOp::Sub) => {
                self.advance();
                let operand = self.parse_expr(bp::UNARY)?;
                let span = token.span.to(operand.span);
                return Ok(Expression::new(
                    ExpressionKind::Prefix(shape_lex::PrefixOp::Minus, Box::new(operand)),
                    span,
                ));
            }
            TokenKind::Infix(InfixOp::Add) => {
                self.advance();
                let operand = self.parse_expr(bp::UNARY)?;
                let span = token.span.to(operand.span);
                return Ok(Expression::new(
                    ExpressionKind::Prefix(shape_lex::PrefixOp::Plus, Box::new(operand)),
                    span,
                ));
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Expression::new(ExpressionKind::Identifier(name), token.span)
            }
            TokenKind::LParen => self.parse_paren_group()?,
            _ => return Err(self.unexpected(Some("operand"))),
        };
        self.parse_postfix(base)
    }

    /// Postfix accessors: members, subscripts, tight applications, and
    /// block invocations.
    fn parse_postfix(&mut self, mut lhs: Expression) -> Result<Expression, ParseError> {
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect_identifier("member name")?;
                    let span = lhs.span.to(member.span);
                    lhs = Expression::new(
                        ExpressionKind::Member(Box::new(lhs), member),
                        span,
                    );
                }
                TokenKind::LBracket if self.peek().glued => {
                    self.advance();
                    self.skip_linebreaks();
                    let index = self.parse_expr(bp::MIN)?;
                    self.skip_linebreaks();
                    let close = self.expect(&TokenKind::RBracket, "closing bracket")?;
                    let span = lhs.span.to(close.span);
                    lhs = Expression::new(
                        ExpressionKind::Subscript(Box::new(lhs), Box::new(index)),
                        span,
                    );
                }
                // An identifier glued to `(` is a function application.
                TokenKind::LParen
                    if self.peek().glued
                        && matches!(lhs.kind, ExpressionKind::Identifier(_)) =>
                {
                    let group = self.parse_paren_group()?;
                    let span = lhs.span.to(group.span);
                    lhs = Expression::new(ExpressionKind::Tuple(vec![lhs, group]), span);
                }
                // `name { ... }` invokes a block, unless the brace belongs
                // to an enclosing `if`/`for`/`switch`.
                TokenKind::LBrace if !self.no_block => {
                    let name = match lhs.kind {
                        ExpressionKind::Identifier(name) => Identifier::new(name, lhs.span),
                        _ => break,
                    };
                    let body = self.parse_block("block body")?;
                    let span = lhs.span.to(body.span);
                    lhs = Expression::new(ExpressionKind::Block(name, body), span);
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    /// Parse a parenthesised group. One element keeps its own expression
    /// kind (with the widened span); zero or several become a tuple.
    /// Line breaks inside parentheses do not separate statements.
    pub(crate) fn parse_paren_group(&mut self) -> Result<Expression, ParseError> {
        let open = self.expect(&TokenKind::LParen, "operand")?;
        let saved_no_block = self.no_block;
        self.no_block = false;

        let mut elements = Vec::new();
        self.skip_linebreaks();
        while !matches!(self.peek().kind, TokenKind::RParen | TokenKind::Eof) {
            elements.push(self.parse_expr(bp::MIN)?);
            self.skip_linebreaks();
        }
        let close = self.expect(&TokenKind::RParen, "closing paren");
        self.no_block = saved_no_block;
        let close = close?;

        let span = open.span.to(close.span);
        let kind = match elements.len() {
            1 => elements.pop().expect("len checked").kind,
            _ => ExpressionKind::Tuple(elements),
        };
        Ok(Expression::new(kind, span))
    }

    /// Consume an identifier token or fail.
    pub(crate) fn expect_identifier(
        &mut self,
        expected: &'static str,
    ) -> Result<Identifier, ParseError> {
        match self.peek().kind {
            TokenKind::Identifier(name) => {
                let token = self.advance();
                Ok(Identifier::new(name, token.span))
            }
            _ => Err(self.unexpected(Some(expected))),
        }
    }
}
