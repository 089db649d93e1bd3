//! Node kind registry.

use serde::{Deserialize, Serialize};
use xtree_core::IncDecOp;

/// Kind tag of every node the extended IR can hold.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumCount,
    strum::IntoStaticStr,
)]
pub enum NodeKind {
    // Mirrors of primitive IR forms
    Constant,
    Variable,
    Index,
    Binary,
    Call,
    Assign,
    Block,
    Lambda,
    Quote,

    // Extended forms
    PreIncrementAssign,
    PreIncrementCheckedAssign,
    PreDecrementAssign,
    PreDecrementCheckedAssign,
    PostIncrementAssign,
    PostIncrementCheckedAssign,
    PostDecrementAssign,
    PostDecrementCheckedAssign,
    NewMultidimensionalArrayInit,
    Invoke,
}

impl NodeKind {
    /// Kinds that have no primitive counterpart and must be lowered.
    pub fn is_extension(self) -> bool {
        !matches!(
            self,
            NodeKind::Constant
                | NodeKind::Variable
                | NodeKind::Index
                | NodeKind::Binary
                | NodeKind::Call
                | NodeKind::Assign
                | NodeKind::Block
                | NodeKind::Lambda
                | NodeKind::Quote
        )
    }
}

/// The eight increment/decrement assignment kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum UnaryAssignKind {
    PreIncrement,
    PreIncrementChecked,
    PreDecrement,
    PreDecrementChecked,
    PostIncrement,
    PostIncrementChecked,
    PostDecrement,
    PostDecrementChecked,
}

impl UnaryAssignKind {
    pub fn is_prefix(self) -> bool {
        matches!(
            self,
            UnaryAssignKind::PreIncrement
                | UnaryAssignKind::PreIncrementChecked
                | UnaryAssignKind::PreDecrement
                | UnaryAssignKind::PreDecrementChecked
        )
    }

    pub fn is_increment(self) -> bool {
        matches!(
            self,
            UnaryAssignKind::PreIncrement
                | UnaryAssignKind::PreIncrementChecked
                | UnaryAssignKind::PostIncrement
                | UnaryAssignKind::PostIncrementChecked
        )
    }

    pub fn is_checked(self) -> bool {
        matches!(
            self,
            UnaryAssignKind::PreIncrementChecked
                | UnaryAssignKind::PreDecrementChecked
                | UnaryAssignKind::PostIncrementChecked
                | UnaryAssignKind::PostDecrementChecked
        )
    }

    /// The primitive store form with the same prefix/direction.
    pub fn inc_dec(self) -> IncDecOp {
        match (self.is_prefix(), self.is_increment()) {
            (true, true) => IncDecOp::PreIncrement,
            (true, false) => IncDecOp::PreDecrement,
            (false, true) => IncDecOp::PostIncrement,
            (false, false) => IncDecOp::PostDecrement,
        }
    }
}

impl From<UnaryAssignKind> for NodeKind {
    fn from(kind: UnaryAssignKind) -> Self {
        match kind {
            UnaryAssignKind::PreIncrement => NodeKind::PreIncrementAssign,
            UnaryAssignKind::PreIncrementChecked => NodeKind::PreIncrementCheckedAssign,
            UnaryAssignKind::PreDecrement => NodeKind::PreDecrementAssign,
            UnaryAssignKind::PreDecrementChecked => NodeKind::PreDecrementCheckedAssign,
            UnaryAssignKind::PostIncrement => NodeKind::PostIncrementAssign,
            UnaryAssignKind::PostIncrementChecked => NodeKind::PostIncrementCheckedAssign,
            UnaryAssignKind::PostDecrement => NodeKind::PostDecrementAssign,
            UnaryAssignKind::PostDecrementChecked => NodeKind::PostDecrementCheckedAssign,
        }
    }
}

impl TryFrom<NodeKind> for UnaryAssignKind {
    type Error = NodeKind;

    fn try_from(kind: NodeKind) -> Result<Self, Self::Error> {
        Ok(match kind {
            NodeKind::PreIncrementAssign => UnaryAssignKind::PreIncrement,
            NodeKind::PreIncrementCheckedAssign => UnaryAssignKind::PreIncrementChecked,
            NodeKind::PreDecrementAssign => UnaryAssignKind::PreDecrement,
            NodeKind::PreDecrementCheckedAssign => UnaryAssignKind::PreDecrementChecked,
            NodeKind::PostIncrementAssign => UnaryAssignKind::PostIncrement,
            NodeKind::PostIncrementCheckedAssign => UnaryAssignKind::PostIncrementChecked,
            NodeKind::PostDecrementAssign => UnaryAssignKind::PostDecrement,
            NodeKind::PostDecrementCheckedAssign => UnaryAssignKind::PostDecrementChecked,
            other => return Err(other),
        })
    }
}
