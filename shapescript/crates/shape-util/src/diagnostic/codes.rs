//! Stable diagnostic codes.
//!
//! Each user-visible error kind gets a numeric code plus a short
//! machine-readable name. Codes are grouped by phase: 1xxx lexer,
//! 2xxx parser, 3xxx runtime, 9xxx warnings.

use std::fmt;

/// A stable identifier for a class of diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    /// Numeric code, unique across the workspace.
    pub code: u16,
    /// Short snake_case name, stable across releases.
    pub name: &'static str,
}

impl DiagnosticCode {
    /// Create a new diagnostic code.
    pub const fn new(code: u16, name: &'static str) -> Self {
        Self { code, name }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code)
    }
}

// Lexer errors.
pub const E_LEX_UNEXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new(1001, "unexpected_token");
pub const E_LEX_INVALID_NUMBER: DiagnosticCode = DiagnosticCode::new(1002, "invalid_number");
pub const E_LEX_INVALID_COLOR: DiagnosticCode = DiagnosticCode::new(1003, "invalid_color");
pub const E_LEX_INVALID_ESCAPE: DiagnosticCode =
    DiagnosticCode::new(1004, "invalid_escape_sequence");
pub const E_LEX_UNTERMINATED_STRING: DiagnosticCode =
    DiagnosticCode::new(1005, "unterminated_string");

// Parser errors.
pub const E_PARSE_UNEXPECTED_TOKEN: DiagnosticCode =
    DiagnosticCode::new(2001, "unexpected_token");

// Runtime errors.
pub const E_RUNTIME_TYPE_MISMATCH: DiagnosticCode = DiagnosticCode::new(3001, "type_mismatch");
pub const E_RUNTIME_UNEXPECTED_ARGUMENT: DiagnosticCode =
    DiagnosticCode::new(3002, "unexpected_argument");
pub const E_RUNTIME_MISSING_ARGUMENT: DiagnosticCode =
    DiagnosticCode::new(3003, "missing_argument");
pub const E_RUNTIME_UNKNOWN_SYMBOL: DiagnosticCode = DiagnosticCode::new(3004, "unknown_symbol");
pub const E_RUNTIME_UNKNOWN_MEMBER: DiagnosticCode = DiagnosticCode::new(3005, "unknown_member");
pub const E_RUNTIME_INVALID_INDEX: DiagnosticCode = DiagnosticCode::new(3006, "invalid_index");
pub const E_RUNTIME_FILE_NOT_FOUND: DiagnosticCode = DiagnosticCode::new(3007, "file_not_found");
pub const E_RUNTIME_ASSERTION: DiagnosticCode = DiagnosticCode::new(3008, "assertion_failure");
pub const E_RUNTIME_REDEFINITION: DiagnosticCode = DiagnosticCode::new(3009, "redefinition");
pub const E_RUNTIME_CYCLIC_IMPORT: DiagnosticCode = DiagnosticCode::new(3010, "cyclic_import");

// Warnings.
pub const W_UNUSED_VALUE: DiagnosticCode = DiagnosticCode::new(9001, "unused_value");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let all = [
            E_LEX_UNEXPECTED_TOKEN,
            E_LEX_INVALID_NUMBER,
            E_LEX_INVALID_COLOR,
            E_LEX_INVALID_ESCAPE,
            E_LEX_UNTERMINATED_STRING,
            E_PARSE_UNEXPECTED_TOKEN,
            E_RUNTIME_TYPE_MISMATCH,
            E_RUNTIME_UNEXPECTED_ARGUMENT,
            E_RUNTIME_MISSING_ARGUMENT,
            E_RUNTIME_UNKNOWN_SYMBOL,
            E_RUNTIME_UNKNOWN_MEMBER,
            E_RUNTIME_INVALID_INDEX,
            E_RUNTIME_FILE_NOT_FOUND,
            E_RUNTIME_ASSERTION,
            E_RUNTIME_REDEFINITION,
            E_RUNTIME_CYCLIC_IMPORT,
            W_UNUSED_VALUE,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.code, b.code, "{} and {} share a code", a.name, b.name);
            }
        }
    }

    #[test]
    fn display_format() {
        assert_eq!(E_LEX_INVALID_NUMBER.to_string(), "E1002");
    }
}
