//! Construction and lowering errors.

use crate::ir::NodeKind;
use thiserror::Error;
use xtree_core::Type;

pub type NodeResult<T> = Result<T, NodeError>;

/// Invariant violations detected while building a node. A factory that
/// returns one of these has not produced any node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("missing required argument `{0}`")]
    MissingArgument(&'static str),
    #[error("rank mismatch: expected {expected} indices, got {found}")]
    RankMismatch { expected: usize, found: usize },
    #[error("index {index} out of range for dimension {dimension} (bound {bound})")]
    IndexOutOfRange {
        dimension: usize,
        index: i32,
        bound: usize,
    },
    #[error("bound {bound} of dimension {dimension} is negative")]
    BoundNegative { dimension: usize, bound: i32 },
    #[error("array bounds must have at least one dimension")]
    EmptyBounds,
    #[error("product of array bounds overflows")]
    BoundsOverflow,
    #[error("array bounds require {expected} elements, got {found}")]
    ElementCountMismatch { expected: usize, found: usize },
    #[error("array element type cannot be void")]
    VoidElementType,
    #[error("element {position} of type {element} cannot initialize an array of {expected}")]
    ElementTypeIncompatible {
        position: usize,
        element: Type,
        expected: Type,
    },
    #[error("parameter `{parameter}` is bound more than once")]
    DuplicateParameterBinding { parameter: String },
    #[error("required parameter `{parameter}` is not bound")]
    UnboundRequiredParameter { parameter: String },
    #[error("parameter `{parameter}` is not a member of `{callee}`")]
    WrongCalleeMember { parameter: String, callee: String },
    #[error("{0} is not an assignable location")]
    NotAssignable(NodeKind),
    #[error("expression of type {0} is not callable")]
    NotCallable(Type),
    #[error("expression of type {0} is not an array")]
    NotAnArray(Type),
    #[error("{0} is not a lambda and cannot be quoted")]
    NotALambda(NodeKind),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: Type, found: Type },
    #[error("argument count mismatch: expected {expected}, found {found}")]
    ArgumentCount { expected: usize, found: usize },
    #[error("{kind} is not defined for type {ty}")]
    OperatorNotDefined { kind: NodeKind, ty: Type },
    #[error("method `{method}` cannot implement a unary assignment: {reason}")]
    InvalidOperatorSignature { method: String, reason: String },
    #[error("internal error: {0}")]
    Unreachable(&'static str),
}

/// Failures while lowering an already-valid tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LowerError {
    #[error("expression nesting exceeds the lowering depth limit of {0}")]
    DepthLimitExceeded(usize),
    #[error("internal error: {0}")]
    Unreachable(&'static str),
}
