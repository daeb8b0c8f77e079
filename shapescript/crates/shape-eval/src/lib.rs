//! shape-eval - The ShapeScript value model and evaluator.
//!
//! This crate turns a parsed [`Program`](shape_par::ast::Program) into a
//! scene: an ordered list of values (mostly geometry nodes), a log, and
//! any non-fatal warnings. It contains:
//!
//! - the runtime [`Value`] taxonomy and the static [`ValueType`] lattice
//!   with its subtype and simplification rules;
//! - the implicit conversion table ([`convert`]) that gives the language
//!   its flexibility (numbers as colours, tuples as vectors, objects as
//!   materials);
//! - the rib-arena [`EvalContext`] of scopes carrying symbols, material,
//!   transform, font, detail, and random state;
//! - the standard library of built-in symbols ([`stdlib`]);
//! - the tree-walking [`Evaluator`];
//! - the static type [`infer`]encer that types expressions and infers
//!   user function and block signatures without evaluating them;
//! - the [`Delegate`] trait through which hosts supply logging, file
//!   resolution, foreign geometry, and fonts.
//!
//! Evaluation of one program is strictly sequential; the geometry cache
//! it shares with the mesh kernel is the only concurrent structure.

pub mod context;
pub mod convert;
pub mod delegate;
pub mod error;
pub mod eval;
pub mod infer;
pub mod stdlib;
pub mod types;
pub mod value;

pub use context::{
    Binding, BlockType, EvalContext, FunctionType, Scope, ScopeId, ScopeKind, UserBlock,
    UserFunction,
};
pub use convert::{can_convert, convert, ConvertError};
pub use delegate::{Delegate, NullDelegate, RecordingDelegate};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use eval::{EvalResult, Evaluator};
pub use infer::{block_type, function_type, static_type, Inferencer};
pub use stdlib::{Builtin, BuiltinKind};
pub use types::ValueType;
pub use value::{RangeValue, Value};
