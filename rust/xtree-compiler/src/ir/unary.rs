//! Increment/decrement assignment nodes.

use super::{Expr, NodeKind, UnaryAssignKind};
use crate::error::{NodeError, NodeResult};
use std::sync::Arc;
use xtree_core::{IncDecOp, MethodRef, Type};

/// `++x`, `x--`, `checked(a[i]++)` and friends.
///
/// The reported kind is always the syntactic one. When a user-defined operator
/// is present it owns the arithmetic, so a checked kind with a method is still
/// lowered without overflow checks; see [`UnaryAssign::strategy`].
#[derive(Debug)]
pub struct UnaryAssign {
    kind: UnaryAssignKind,
    operand: Expr,
    method: Option<MethodRef>,
}

/// How a [`UnaryAssign`] is lowered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoweringStrategy<'a> {
    /// Wrapping primitive increment/decrement store.
    Primitive(IncDecOp),
    /// Read, overflow-checked add/subtract of one, write back.
    Checked,
    /// Read, call the operator, write back.
    UserOperator(&'a MethodRef),
}

impl UnaryAssign {
    pub(crate) fn new(
        kind: UnaryAssignKind,
        operand: Expr,
        method: Option<MethodRef>,
    ) -> NodeResult<Self> {
        if !operand.is_location() {
            return Err(NodeError::NotAssignable(operand.kind()));
        }
        let ty = operand.ty();
        match &method {
            Some(method) => check_operator(method, &ty)?,
            None if !ty.is_arithmetic() => {
                return Err(NodeError::OperatorNotDefined {
                    kind: kind.into(),
                    ty,
                })
            }
            None => {}
        }
        Ok(Self {
            kind,
            operand,
            method,
        })
    }

    pub fn kind(&self) -> UnaryAssignKind {
        self.kind
    }

    pub fn node_kind(&self) -> NodeKind {
        self.kind.into()
    }

    pub fn operand(&self) -> &Expr {
        &self.operand
    }

    pub fn method(&self) -> Option<&MethodRef> {
        self.method.as_ref()
    }

    /// Same as the operand's type.
    pub fn ty(&self) -> Type {
        self.operand.ty()
    }

    pub fn strategy(&self) -> LoweringStrategy<'_> {
        match (&self.method, self.kind.is_checked()) {
            (Some(method), _) => LoweringStrategy::UserOperator(method),
            (None, true) => LoweringStrategy::Checked,
            (None, false) => LoweringStrategy::Primitive(self.kind.inc_dec()),
        }
    }

    pub fn update(this: &Arc<Self>, operand: Expr) -> NodeResult<Arc<Self>> {
        if operand.same(&this.operand) {
            return Ok(Arc::clone(this));
        }
        Self::new(this.kind, operand, this.method.clone()).map(Arc::new)
    }
}

fn check_operator(method: &MethodRef, operand: &Type) -> NodeResult<()> {
    let invalid = |reason: String| NodeError::InvalidOperatorSignature {
        method: method.name.clone(),
        reason,
    };
    let params = method.signature.params();
    if params.len() != 1 {
        return Err(invalid(format!(
            "expected exactly one parameter, found {}",
            params.len()
        )));
    }
    if !params[0].ty().is_assignable_from(operand) {
        return Err(invalid(format!(
            "parameter of type {} does not accept operand of type {}",
            params[0].ty(), operand
        )));
    }
    let ret = method.signature.return_type();
    if !operand.is_assignable_from(ret) {
        return Err(invalid(format!(
            "result of type {} cannot be stored into {}",
            ret, operand
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtree_core::{Constant, Signature, Var};

    fn incr_method(ty: Type) -> MethodRef {
        let sig = Signature::builder("op_Increment")
            .param("value", ty.clone())
            .returns(ty);
        MethodRef::new("op_Increment", sig)
    }

    #[test]
    fn operand_must_be_assignable() {
        let err = Expr::unary_assign(
            UnaryAssignKind::PreIncrement,
            Expr::constant(Constant::I32(1)),
            None,
        )
        .unwrap_err();
        assert_eq!(err, NodeError::NotAssignable(NodeKind::Constant));
    }

    #[test]
    fn non_numeric_operand_needs_method() {
        let s = Var::new("s", Type::Str);
        let err = Expr::unary_assign(UnaryAssignKind::PostIncrement, Expr::variable(&s), None)
            .unwrap_err();
        assert_eq!(
            err,
            NodeError::OperatorNotDefined {
                kind: NodeKind::PostIncrementAssign,
                ty: Type::Str
            }
        );

        let node = Expr::unary_assign(
            UnaryAssignKind::PostIncrement,
            Expr::variable(&s),
            Some(incr_method(Type::Str)),
        )
        .expect("method makes it valid");
        assert_eq!(node.ty(), Type::Str);
    }

    #[test]
    fn operator_signature_is_checked() {
        let x = Var::new("x", Type::I32);
        let err = Expr::unary_assign(
            UnaryAssignKind::PreIncrement,
            Expr::variable(&x),
            Some(incr_method(Type::I64)),
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidOperatorSignature { .. }));

        let two = Signature::builder("op")
            .param("a", Type::I32)
            .param("b", Type::I32)
            .returns(Type::I32);
        let err = Expr::unary_assign(
            UnaryAssignKind::PreIncrement,
            Expr::variable(&x),
            Some(MethodRef::new("op", two)),
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidOperatorSignature { .. }));
    }

    #[test]
    fn checked_kind_with_method_keeps_kind_but_lowers_through_operator() {
        let x = Var::new("x", Type::I32);
        let expr = Expr::unary_assign(
            UnaryAssignKind::PreIncrementChecked,
            Expr::variable(&x),
            Some(incr_method(Type::I32)),
        )
        .unwrap();
        assert_eq!(expr.kind(), NodeKind::PreIncrementCheckedAssign);
        let Expr::UnaryAssign(node) = &expr else { panic!("expected unary assign") };
        assert!(matches!(
            node.strategy(),
            LoweringStrategy::UserOperator(m) if m.name == "op_Increment"
        ));
    }

    #[test]
    fn strategy_follows_kind() {
        let x = Var::new("x", Type::U8);
        let checked =
            UnaryAssign::new(UnaryAssignKind::PostDecrementChecked, Expr::variable(&x), None)
                .unwrap();
        assert_eq!(checked.strategy(), LoweringStrategy::Checked);
        assert!(checked.method().is_none());

        let plain = UnaryAssign::new(UnaryAssignKind::PostDecrement, Expr::variable(&x), None)
            .unwrap();
        assert_eq!(
            plain.strategy(),
            LoweringStrategy::Primitive(IncDecOp::PostDecrement)
        );
    }

    #[test]
    fn update_returns_same_node_for_identical_operand() {
        let x = Var::new("x", Type::I64);
        let y = Var::new("y", Type::I64);
        let node = Arc::new(
            UnaryAssign::new(UnaryAssignKind::PreDecrement, Expr::variable(&x), None).unwrap(),
        );

        let same = UnaryAssign::update(&node, Expr::variable(&x)).unwrap();
        assert!(Arc::ptr_eq(&node, &same));

        let changed = UnaryAssign::update(&node, Expr::variable(&y)).unwrap();
        assert!(!Arc::ptr_eq(&node, &changed));
        assert!(changed.operand().same(&Expr::variable(&y)));
        assert_eq!(changed.kind(), UnaryAssignKind::PreDecrement);

        let err = UnaryAssign::update(&node, Expr::constant(Constant::I64(0))).unwrap_err();
        assert_eq!(err, NodeError::NotAssignable(NodeKind::Constant));
    }
}
