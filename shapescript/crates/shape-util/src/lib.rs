//! shape-util - Foundation types for the ShapeScript language core.
//!
//! This crate provides the utilities shared by every phase of the
//! ShapeScript pipeline:
//!
//! - **Source positions** ([`span`]): byte-range [`Span`]s, [`SourceFile`]
//!   line tables, and the [`SourceMap`] that turns byte offsets into
//!   line/column coordinates for display.
//! - **Diagnostics** ([`diagnostic`]): structured error/warning values with
//!   messages, hints, correction suggestions, and source snippets, plus the
//!   [`Handler`] that collects them.
//! - **Symbols** ([`symbol`]): a global, thread-safe string interner so that
//!   identifiers compare and hash in O(1).
//! - **Typed indices** ([`index_vec`]): [`IndexVec`], a vector indexed by a
//!   domain-specific id type (scope ids, file ids) instead of bare `usize`.
//!
//! Nothing in this crate knows about geometry or the language grammar; it is
//! the dependency root of the workspace.

pub mod diagnostic;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level, SourceSnippet};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::Symbol;
