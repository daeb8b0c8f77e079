//! Lexer module.
//!
//! The implementation is split into focused components:
//! - `core` - Main Lexer struct, trivia skipping, and dispatch
//! - `ident` - Identifiers, keywords, word operators, phantom parens
//! - `number` - Number literal lexing
//! - `string` - String literal lexing and escape handling
//! - `color` - Hex colour literal lexing
//! - `operator` - Punctuation operators and spelling suggestions

mod color;
mod core;
mod ident;
mod number;
mod operator;
mod string;

pub use core::Lexer;
