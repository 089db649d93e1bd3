//! xtree compiler
//!
//! Extended expression nodes (checked and unchecked increment/decrement
//! assignment, multi-dimensional array initializers, invocation with named
//! parameter bindings) plus the lowering engine that rewrites them into the
//! primitive IR of `xtree-core`.

pub mod error;
pub mod ir;
pub mod lower;
pub mod options;
pub mod visitor;

pub use error::{LowerError, NodeError, NodeResult};
pub use ir::{
    ArgumentSlot, ArrayInitBuilder, Expr, Invocation, InvocationBuilder, LoweringStrategy,
    NewArrayInit, NodeKind, ParameterBinding, UnaryAssign, UnaryAssignKind,
};
pub use lower::{lower, lower_with, Lowerer};
pub use options::LowerOptions;
pub use visitor::Visitor;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid node: {0}")]
    Node(#[from] NodeError),
    #[error("lowering failed: {0}")]
    Lower(#[from] LowerError),
    #[error("invalid options: {0}")]
    Config(#[from] toml::de::Error),
}

/// Load [`LowerOptions`] from TOML text and lower `expr` with them.
pub fn lower_configured(expr: &Expr, options_toml: &str) -> Result<xtree_core::Prim, Error> {
    let options = LowerOptions::from_toml_str(options_toml)?;
    Ok(Lowerer::new(options).lower(expr)?)
}
