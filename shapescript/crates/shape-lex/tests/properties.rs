//! Property tests for the lexer.
//!
//! Two global guarantees:
//! - tokenisation is total: any input either lexes cleanly or produces a
//!   single in-bounds error, never a panic;
//! - token spans are faithful: they are monotonically ordered, in bounds,
//!   and the gaps between them contain only whitespace, commas, and
//!   comment text, so concatenating token slices plus skipped trivia
//!   reproduces the original source.

use proptest::prelude::*;
use shape_lex::{tokenize, TokenKind};
use shape_util::span::FileId;

/// Generator biased towards ShapeScript-looking text so the interesting
/// paths (numbers, strings, operators, comments) actually get exercised.
fn source_strategy() -> impl Strategy<Value = String> {
    let word = prop_oneof![
        Just("cube".to_string()),
        Just("sphere".to_string()),
        Just("define".to_string()),
        Just("size".to_string()),
        Just("1.5".to_string()),
        Just("42".to_string()),
        Just("\"hi\"".to_string()),
        Just("#f00".to_string()),
        Just("(".to_string()),
        Just(")".to_string()),
        Just("{".to_string()),
        Just("}".to_string()),
        Just("+".to_string()),
        Just("-".to_string()),
        Just("*".to_string()),
        Just("<".to_string()),
        Just("<=".to_string()),
        Just("and".to_string()),
        Just("to".to_string()),
        Just(",".to_string()),
        Just(";".to_string()),
        Just("\n".to_string()),
        Just(" ".to_string()),
        Just("// note\n".to_string()),
        Just("/* c */".to_string()),
        Just(".".to_string()),
    ];
    proptest::collection::vec(word, 0..40).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn tokenisation_is_total(source in "\\PC{0,60}") {
        // Arbitrary printable input: must never panic, and any error span
        // must be in bounds.
        match tokenize(&source, FileId::DUMMY) {
            Ok(tokens) => {
                prop_assert!(matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)));
            }
            Err(err) => {
                prop_assert!(err.span.start <= err.span.end);
                prop_assert!(err.span.end <= source.len());
            }
        }
    }

    #[test]
    fn spans_are_monotonic_and_in_bounds(source in source_strategy()) {
        if let Ok(tokens) = tokenize(&source, FileId::DUMMY) {
            let mut previous_end = 0usize;
            for token in &tokens {
                prop_assert!(token.span.start >= previous_end || token.span.is_empty(),
                    "token {:?} starts before previous end {}", token, previous_end);
                prop_assert!(token.span.end <= source.len());
                if !token.span.is_empty() {
                    previous_end = token.span.end;
                }
            }
        }
    }

    #[test]
    fn gaps_between_tokens_are_trivia(source in source_strategy()) {
        if let Ok(tokens) = tokenize(&source, FileId::DUMMY) {
            let mut previous_end = 0usize;
            for token in tokens.iter().filter(|t| !t.span.is_empty()) {
                let gap = &source[previous_end..token.span.start];
                // Gaps may only hold whitespace, comment text, or the
                // separators that collapse into Linebreak tokens.
                prop_assert!(
                    gap.chars().all(|c| c.is_whitespace() || c == ',' || c == ';')
                        || gap.contains("//")
                        || gap.contains("/*"),
                    "unexpected gap {:?}", gap
                );
                previous_end = token.span.end;
            }
        }
    }
}
