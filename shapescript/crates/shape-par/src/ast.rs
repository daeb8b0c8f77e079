//! AST node definitions.
//!
//! Every node carries the byte range it was parsed from. Equality includes
//! spans, which makes the parse round-trip property exact: parsing the
//! same source twice yields identical trees.

use std::sync::Arc;

use shape_lex::{InfixOp, PrefixOp};
use shape_util::span::{FileId, Span};
use shape_util::symbol::Symbol;

/// A parsed program: the statement list plus its source text and file.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    /// The original source text, shared with the source map.
    pub source: Arc<str>,
    pub file_id: FileId,
}

/// An identifier occurrence with its source range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Identifier {
    pub name: Symbol,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: Symbol, span: Span) -> Self {
        Self { name, span }
    }
}

/// An ordered sequence of statements with its own source range.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

/// A statement with its source range.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

/// The statement variants.
#[derive(Clone, Debug, PartialEq)]
pub enum StatementKind {
    /// `define NAME <definition>`
    Define(Identifier, Definition),
    /// `option NAME <default>` - declares a parameter of the enclosing block.
    Option(Identifier, Expression),
    /// `NAME [argument]` - a named setter or call; the argument is a single
    /// expression, possibly a tuple of juxtaposed operands.
    Command(Identifier, Option<Expression>),
    /// `for [index in] iterable { ... }`
    ForLoop {
        index: Option<Identifier>,
        iterable: Expression,
        body: Block,
    },
    /// `if condition { ... } [else { ... }]`
    IfElse {
        condition: Expression,
        then_body: Block,
        else_body: Option<Block>,
    },
    /// `switch subject { case pattern ... [else ...] }`
    Switch {
        subject: Expression,
        cases: Vec<CaseClause>,
        default: Option<Block>,
    },
    /// `import "path"`
    Import(Expression),
    /// A bare expression; the enclosing scope decides what to do with the
    /// value (collect it, emit it as geometry, or warn that it is unused).
    Expression(Expression),
}

/// The right-hand side of a `define`.
#[derive(Clone, Debug, PartialEq)]
pub enum Definition {
    /// `define foo <expression>` - a constant.
    Expression(Expression),
    /// `define foo { ... }` - a callable block.
    Block(Block),
    /// `define foo(a b) { ... }` - a function with named parameters.
    Function(Vec<Identifier>, Block),
}

/// One `case` clause of a switch statement.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub pattern: Expression,
    pub body: Block,
}

/// An expression with its source range.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The expression variants.
#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionKind {
    /// Number literal.
    Number(f64),
    /// String literal.
    String(String),
    /// Hex colour literal (the digits after `#`).
    HexColor(String),
    /// A name to resolve at evaluation time.
    Identifier(Symbol),
    /// `lhs.name`
    Member(Box<Expression>, Identifier),
    /// `lhs[index]`
    Subscript(Box<Expression>, Box<Expression>),
    /// Juxtaposed operands: `1 2 3`, or an application `sum (1 2)` whose
    /// head resolves to a function at evaluation time.
    Tuple(Vec<Expression>),
    /// `name { ... }` - a block invocation in expression position.
    Block(Identifier, Block),
    /// `lhs op rhs`
    Infix(Box<Expression>, InfixOp, Box<Expression>),
    /// `op operand`
    Prefix(PrefixOp, Box<Expression>),
}

impl Expression {
    /// The head identifier of a command-shaped expression, if any: a bare
    /// identifier, or a tuple whose first element is an identifier.
    pub fn command_head(&self) -> Option<Identifier> {
        match &self.kind {
            ExpressionKind::Identifier(name) => Some(Identifier::new(*name, self.span)),
            ExpressionKind::Tuple(elements) => match elements.first() {
                Some(Expression {
                    kind: ExpressionKind::Identifier(name),
                    span,
                }) => Some(Identifier::new(*name, *span)),
                _ => None,
            },
            _ => None,
        }
    }
}
