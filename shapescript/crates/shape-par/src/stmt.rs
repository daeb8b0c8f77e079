//! Statement parsing.
//!
//! Control structures (`define`, `option`, `for`, `if`, `switch`,
//! `import`) are recognised by keyword. Any other line starting with an
//! identifier parses as a command over the juxtaposed operands; the
//! evaluator's symbol table decides what the name means.

use shape_lex::{InfixOp, Keyword, TokenKind};

use crate::ast::{
    Block, CaseClause, Definition, Expression, ExpressionKind, Identifier, Statement,
    StatementKind,
};
use crate::{ParseError, Parser};

impl Parser {
    /// Parse statements until the terminator predicate matches, consuming
    /// separating line breaks. The terminator itself is not consumed.
    pub(crate) fn parse_statements_until(
        &mut self,
        terminator: impl Fn(&TokenKind) -> bool,
    ) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_linebreaks();
            let kind = &self.peek().kind;
            if terminator(kind) {
                return Ok(statements);
            }
            if matches!(kind, TokenKind::Eof) {
                return Err(self.unexpected(Some("closing brace")));
            }
            statements.push(self.parse_statement()?);

            // Statements are separated by line breaks (or a terminator).
            let kind = &self.peek().kind;
            if terminator(kind) || matches!(kind, TokenKind::Linebreak | TokenKind::Eof) {
                continue;
            }
            return Err(self.unexpected(None));
        }
    }

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Define) => self.parse_define(),
            TokenKind::Keyword(Keyword::Option) => self.parse_option(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            // `else` and `case` only make sense inside their statements.
            TokenKind::Keyword(Keyword::Else) | TokenKind::Keyword(Keyword::Case) => {
                Err(self.unexpected(None))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// A line that is not keyword-led: a command when it starts with an
    /// identifier, a bare expression otherwise.
    fn parse_expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.parse_expression_line()?;
        let span = expr.span;
        let kind = match expr.kind {
            ExpressionKind::Identifier(name) => {
                StatementKind::Command(Identifier::new(name, span), None)
            }
            ExpressionKind::Tuple(mut elements)
                if matches!(
                    elements.first().map(|e| &e.kind),
                    Some(ExpressionKind::Identifier(_))
                ) =>
            {
                let head = elements.remove(0);
                let name = match head.kind {
                    ExpressionKind::Identifier(name) => Identifier::new(name, head.span),
                    _ => unreachable!("guarded by the match arm"),
                };
                let arg = if elements.len() == 1 {
                    elements.pop().expect("len checked")
                } else {
                    let arg_span = elements[0].span.to(elements[elements.len() - 1].span);
                    Expression::new(ExpressionKind::Tuple(elements), arg_span)
                };
                StatementKind::Command(name, Some(arg))
            }
            other => StatementKind::Expression(Expression::new(other, span)),
        };
        Ok(Statement { kind, span })
    }

    /// `define NAME (expression | { block } | (params) { body })`
    fn parse_define(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance();
        let name = self.expect_identifier("identifier")?;

        let definition = match self.peek().kind {
            TokenKind::LBrace => Definition::Block(self.parse_block("block body")?),
            TokenKind::LParen => {
                // `define foo(a b) { ... }` is a function; anything else
                // after the `(` is a plain parenthesised expression, e.g.
                // `define foo (1 2)`.
                match self.try_parse_function() {
                    Some(result) => result?,
                    None => Definition::Expression(self.parse_expression_line()?),
                }
            }
            _ => Definition::Expression(self.parse_expression_line()?),
        };

        let end_span = match &definition {
            Definition::Expression(expr) => expr.span,
            Definition::Block(block) | Definition::Function(_, block) => block.span,
        };
        Ok(Statement {
            kind: StatementKind::Define(name, definition),
            span: keyword.span.to(end_span),
        })
    }

    /// Attempt the function-definition form. Returns `None` (with the
    /// parser rewound) when the parenthesis does not hold a parameter
    /// list followed by a body.
    fn try_parse_function(&mut self) -> Option<Result<Definition, ParseError>> {
        let snapshot = self.snapshot();
        self.advance(); // (
        let mut params = Vec::new();
        while let TokenKind::Identifier(_) = self.peek().kind {
            let ident = self
                .expect_identifier("parameter")
                .expect("peeked an identifier");
            params.push(ident);
        }
        if !self.eat(&TokenKind::RParen) || !matches!(self.peek().kind, TokenKind::LBrace) {
            self.rewind(snapshot);
            return None;
        }
        Some(
            self.parse_block("function body")
                .map(|body| Definition::Function(params, body)),
        )
    }

    /// `option NAME default`
    fn parse_option(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance();
        let name = self.expect_identifier("identifier")?;
        let default = self.parse_expression_line()?;
        let span = keyword.span.to(default.span);
        Ok(Statement {
            kind: StatementKind::Option(name, default),
            span,
        })
    }

    /// `import "file.shape"`
    fn parse_import(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance();
        let path = self.parse_expression_line()?;
        let span = keyword.span.to(path.span);
        Ok(Statement {
            kind: StatementKind::Import(path),
            span,
        })
    }

    /// `for [index in] iterable { body }`, parentheses around the head
    /// optional.
    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance();

        // `for { }` has no iterable at all.
        if matches!(self.peek().kind, TokenKind::LBrace) {
            return Err(self.unexpected(Some("range")));
        }

        let (index, iterable) = if self.is_loop_binder() {
            let index = self.expect_identifier("loop index")?;
            self.advance(); // in
            let iterable = self.parse_loop_head("range")?;
            (Some(index), iterable)
        } else {
            let head_token = self.peek().clone();
            let expr = self.parse_loop_head("range")?;
            match expr.kind {
                ExpressionKind::Infix(lhs, InfixOp::In, rhs) => match lhs.kind {
                    ExpressionKind::Identifier(name) => {
                        (Some(Identifier::new(name, lhs.span)), *rhs)
                    }
                    _ => return Err(ParseError::new(head_token, Some("loop index"))),
                },
                other => (None, Expression::new(other, expr.span)),
            }
        };

        let body = self.parse_block("loop body")?;
        let span = keyword.span.to(body.span);
        Ok(Statement {
            kind: StatementKind::ForLoop {
                index,
                iterable,
                body,
            },
            span,
        })
    }

    /// Whether the head of a `for` is the `IDENT in` binder form.
    fn is_loop_binder(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Identifier(_))
            && matches!(self.peek_ahead(1).kind, TokenKind::Infix(InfixOp::In))
    }

    /// Parse a loop/condition head expression with block invocation
    /// disabled, mapping a missing operand onto the caller's expectation.
    fn parse_loop_head(&mut self, expected: &'static str) -> Result<Expression, ParseError> {
        let saved = self.no_block;
        self.no_block = true;
        let result = self.parse_expression_line();
        self.no_block = saved;
        result.map_err(|err| match err.expected {
            Some("operand") => ParseError {
                expected: Some(expected),
                ..err
            },
            _ => err,
        })
    }

    /// `if condition { } [else { } | else if ...]`
    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance();
        let condition = self.parse_loop_head("condition")?;
        let then_body = self.parse_block("block body")?;

        // `else` must follow the closing brace, possibly on the next line.
        let snapshot = self.snapshot();
        self.skip_linebreaks();
        let else_body = if self.eat(&TokenKind::Keyword(Keyword::Else)) {
            if matches!(self.peek().kind, TokenKind::Keyword(Keyword::If)) {
                let nested = self.parse_if()?;
                let span = nested.span;
                Some(Block {
                    statements: vec![nested],
                    span,
                })
            } else {
                Some(self.parse_block("block body")?)
            }
        } else {
            self.rewind(snapshot);
            None
        };

        let end_span = else_body.as_ref().map(|b| b.span).unwrap_or(then_body.span);
        let span = keyword.span.to(end_span);
        Ok(Statement {
            kind: StatementKind::IfElse {
                condition,
                then_body,
                else_body,
            },
            span,
        })
    }

    /// `switch subject { case pattern ... [else ...] }`
    fn parse_switch(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance();
        let subject = self.parse_loop_head("operand")?;
        self.expect(&TokenKind::LBrace, "switch body")?;

        let mut cases = Vec::new();
        let mut default = None;
        let close = loop {
            self.skip_linebreaks();
            match self.peek().kind {
                TokenKind::Keyword(Keyword::Case) => {
                    if default.is_some() {
                        // A case after `else` can never match.
                        return Err(self.unexpected(None));
                    }
                    self.advance();
                    if matches!(self.peek().kind, TokenKind::Linebreak | TokenKind::RBrace) {
                        return Err(self.unexpected(Some("pattern")));
                    }
                    let pattern = self.parse_case_pattern()?;
                    let body = self.parse_case_body()?;
                    cases.push(CaseClause { pattern, body });
                }
                TokenKind::Keyword(Keyword::Else) => {
                    if default.is_some() {
                        return Err(self.unexpected(None));
                    }
                    self.advance();
                    default = Some(self.parse_case_body()?);
                }
                TokenKind::RBrace => break self.advance(),
                TokenKind::Identifier(name) if name.as_str() == "default" => {
                    return Err(self.unexpected(None).with_suggestion("else"));
                }
                TokenKind::Eof => return Err(self.unexpected(Some("closing brace"))),
                _ => return Err(self.unexpected(Some("case statement"))),
            }
        };

        let span = keyword.span.to(close.span);
        Ok(Statement {
            kind: StatementKind::Switch {
                subject,
                cases,
                default,
            },
            span,
        })
    }

    /// The pattern of a `case` clause: the rest of the line.
    fn parse_case_pattern(&mut self) -> Result<Expression, ParseError> {
        self.parse_expression_line().map_err(|err| match err.expected {
            Some("operand") => ParseError {
                expected: Some("pattern"),
                ..err
            },
            _ => err,
        })
    }

    /// The statements of a case body, running until the next `case`,
    /// `else`, or the closing brace.
    fn parse_case_body(&mut self) -> Result<Block, ParseError> {
        let start = self.peek().span;
        let statements = self.parse_statements_until(|kind| {
            matches!(
                kind,
                TokenKind::Keyword(Keyword::Case)
                    | TokenKind::Keyword(Keyword::Else)
                    | TokenKind::RBrace
            )
        })?;
        let span = statements
            .first()
            .map(|first| {
                first
                    .span
                    .to(statements.last().expect("non-empty").span)
            })
            .unwrap_or(start);
        Ok(Block { statements, span })
    }

    /// Parse a brace-delimited block; `expected` names what the brace was
    /// supposed to open when it is missing.
    pub(crate) fn parse_block(&mut self, expected: &'static str) -> Result<Block, ParseError> {
        if !matches!(self.peek().kind, TokenKind::LBrace) {
            return Err(self.unexpected(Some(expected)));
        }
        let saved = self.no_block;
        self.no_block = false;
        let open = self.advance();
        let statements =
            self.parse_statements_until(|kind| matches!(kind, TokenKind::RBrace));
        self.no_block = saved;
        let statements = statements?;
        let close = self.expect(&TokenKind::RBrace, "closing brace")?;
        Ok(Block {
            statements,
            span: open.span.to(close.span),
        })
    }
}
