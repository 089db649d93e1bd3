//! xtree Core
//!
//! Shared types, callable signatures, and the primitive IR that extended
//! expression trees are lowered into.

pub mod lir;
pub mod signature;
pub mod types;

pub use lir::{ArithOp, Constant, IncDecOp, Place, Prim, PrimLambda, Var, VarId};
pub use signature::{MethodRef, Parameter, Signature, SignatureId};
pub use types::Type;
