//! Parser property tests.
//!
//! Parsing is a pure function of the source text: the same input yields
//! the same tree (spans included), and generated well-formed programs
//! always parse. Trees also survive trailing-whitespace normalisation
//! modulo range metadata.

use proptest::prelude::*;
use shape_par::ast::{Expression, ExpressionKind, Statement, StatementKind};
use shape_par::parse_source;
use shape_util::span::FileId;

/// A generated identifier that is never a keyword or word-operator.
fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}".prop_filter("reserved words are not identifiers", |name| {
        !matches!(
            name.as_str(),
            "define"
                | "option"
                | "for"
                | "if"
                | "else"
                | "switch"
                | "case"
                | "import"
                | "and"
                | "or"
                | "not"
                | "to"
                | "step"
                | "in"
        )
    })
}

fn number() -> impl Strategy<Value = String> {
    (0u32..10_000, 0u32..100).prop_map(|(whole, frac)| {
        if frac == 0 {
            whole.to_string()
        } else {
            format!("{}.{:02}", whole, frac)
        }
    })
}

/// A well-formed statement line.
fn statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (ident(), number()).prop_map(|(name, value)| format!("define {} {}", name, value)),
        (ident(), number(), number())
            .prop_map(|(name, a, b)| format!("{} {} {}", name, a, b)),
        (ident(), number()).prop_map(|(name, n)| format!("{} {{ size {} }}", name, n)),
        (ident(), number(), number()).prop_map(|(index, from, to)| {
            format!("for {} in {} to {} {{\n    cube\n}}", index, from, to)
        }),
        (number(), number())
            .prop_map(|(a, b)| format!("if {} < {} {{\n    sphere\n}}", a, b)),
        (ident(), number()).prop_map(|(name, n)| format!("print {} + {}", name, n)),
    ]
}

fn program() -> impl Strategy<Value = String> {
    proptest::collection::vec(statement(), 0..8).prop_map(|lines| lines.join("\n"))
}

/// Strip spans so trees can be compared modulo range metadata.
fn shape_of(statements: &[Statement]) -> Vec<String> {
    fn expr(expression: &Expression) -> String {
        match &expression.kind {
            ExpressionKind::Number(n) => format!("n{}", n),
            ExpressionKind::String(s) => format!("s{:?}", s),
            ExpressionKind::HexColor(h) => format!("#{}", h),
            ExpressionKind::Identifier(name) => format!("i{}", name),
            ExpressionKind::Member(lhs, member) => format!("{}.{}", expr(lhs), member.name),
            ExpressionKind::Subscript(lhs, index) => {
                format!("{}[{}]", expr(lhs), expr(index))
            }
            ExpressionKind::Tuple(elements) => {
                let inner: Vec<String> = elements.iter().map(expr).collect();
                format!("({})", inner.join(" "))
            }
            ExpressionKind::Block(name, body) => {
                format!("{}{{{}}}", name.name, shape_of(&body.statements).join(";"))
            }
            ExpressionKind::Infix(lhs, op, rhs) => {
                format!("({} {} {})", expr(lhs), op, expr(rhs))
            }
            ExpressionKind::Prefix(op, operand) => format!("({} {})", op, expr(operand)),
        }
    }
    statements
        .iter()
        .map(|statement| match &statement.kind {
            StatementKind::Define(name, _) => format!("define {}", name.name),
            StatementKind::Option(name, default) => {
                format!("option {} {}", name.name, expr(default))
            }
            StatementKind::Command(name, argument) => match argument {
                Some(argument) => format!("cmd {} {}", name.name, expr(argument)),
                None => format!("cmd {}", name.name),
            },
            StatementKind::ForLoop { body, .. } => {
                format!("for[{}]", shape_of(&body.statements).join(";"))
            }
            StatementKind::IfElse {
                then_body,
                else_body,
                ..
            } => format!(
                "if[{}][{}]",
                shape_of(&then_body.statements).join(";"),
                else_body
                    .as_ref()
                    .map(|body| shape_of(&body.statements).join(";"))
                    .unwrap_or_default()
            ),
            StatementKind::Switch { cases, .. } => format!("switch[{}]", cases.len()),
            StatementKind::Import(path) => format!("import {}", expr(path)),
            StatementKind::Expression(expression) => format!("expr {}", expr(expression)),
        })
        .collect()
}

proptest! {
    /// Parsing is deterministic, spans and all.
    #[test]
    fn parsing_is_reproducible(source in program()) {
        let first = parse_source(&source, FileId::DUMMY).expect("generated programs parse");
        let second = parse_source(&source, FileId::DUMMY).expect("generated programs parse");
        prop_assert_eq!(first, second);
    }

    /// Trailing whitespace and extra blank lines change spans but not the
    /// parsed shape.
    #[test]
    fn layout_noise_does_not_change_the_tree(source in program()) {
        let noisy = format!("\n\n{}  \n\n", source.replace('\n', "  \n\n"));
        let plain = parse_source(&source, FileId::DUMMY).expect("plain parses");
        let reformatted = parse_source(&noisy, FileId::DUMMY).expect("noisy parses");
        prop_assert_eq!(
            shape_of(&plain.statements),
            shape_of(&reformatted.statements)
        );
    }

    /// Every statement's span covers its children and stays in bounds.
    #[test]
    fn spans_nest_and_stay_in_bounds(source in program()) {
        let program = parse_source(&source, FileId::DUMMY).expect("generated programs parse");
        for statement in &program.statements {
            prop_assert!(statement.span.end <= source.len());
            prop_assert!(statement.span.start <= statement.span.end);
        }
        for pair in program.statements.windows(2) {
            prop_assert!(pair[0].span.start <= pair[1].span.start);
        }
    }
}
