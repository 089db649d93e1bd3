//! Extended expression trees.
//!
//! An [`Expr`] is a cheap handle: composite nodes sit behind an `Arc` and are
//! immutable once built, so subtrees are shared freely and "unchanged" means
//! pointer-identical (see [`Expr::same`]). Every node is produced by a
//! validating factory; there is no public way to build an invalid one.

mod array;
mod invoke;
mod kind;
mod unary;

pub use array::{ArrayInitBuilder, NewArrayInit};
pub use invoke::{ArgumentSlot, Invocation, InvocationBuilder, ParameterBinding};
pub use kind::{NodeKind, UnaryAssignKind};
pub use unary::{LoweringStrategy, UnaryAssign};

use crate::error::{NodeError, NodeResult};
use std::sync::Arc;
use xtree_core::{ArithOp, Constant, MethodRef, Signature, Type, Var};

#[derive(Debug, Clone)]
pub enum Expr {
    Constant(Constant),
    Variable(Var),
    Index(Arc<IndexExpr>),
    Binary(Arc<BinaryExpr>),
    Call(Arc<CallExpr>),
    Assign(Arc<AssignExpr>),
    Block(Arc<BlockExpr>),
    Lambda(Arc<LambdaExpr>),
    Quote(Arc<QuoteExpr>),
    UnaryAssign(Arc<UnaryAssign>),
    NewArrayInit(Arc<NewArrayInit>),
    Invoke(Arc<Invocation>),
}

impl Expr {
    // ── Factories ──

    pub fn constant(value: Constant) -> Expr {
        Expr::Constant(value)
    }

    pub fn variable(var: &Var) -> Expr {
        Expr::Variable(var.clone())
    }

    pub fn index(array: Expr, indices: Vec<Expr>) -> NodeResult<Expr> {
        IndexExpr::new(array, indices).map(|n| Expr::Index(Arc::new(n)))
    }

    pub fn binary(op: ArithOp, checked: bool, left: Expr, right: Expr) -> NodeResult<Expr> {
        BinaryExpr::new(op, checked, left, right).map(|n| Expr::Binary(Arc::new(n)))
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> NodeResult<Expr> {
        CallExpr::new(callee, args).map(|n| Expr::Call(Arc::new(n)))
    }

    pub fn assign(target: Expr, value: Expr) -> NodeResult<Expr> {
        AssignExpr::new(target, value).map(|n| Expr::Assign(Arc::new(n)))
    }

    pub fn block(locals: Vec<Var>, body: Vec<Expr>) -> NodeResult<Expr> {
        BlockExpr::new(locals, body).map(|n| Expr::Block(Arc::new(n)))
    }

    pub fn lambda(signature: Arc<Signature>, params: Vec<Var>, body: Expr) -> NodeResult<Expr> {
        LambdaExpr::new(signature, params, body).map(|n| Expr::Lambda(Arc::new(n)))
    }

    pub fn quote(operand: Expr) -> NodeResult<Expr> {
        QuoteExpr::new(operand).map(|n| Expr::Quote(Arc::new(n)))
    }

    pub fn unary_assign(
        kind: UnaryAssignKind,
        operand: Expr,
        method: Option<MethodRef>,
    ) -> NodeResult<Expr> {
        UnaryAssign::new(kind, operand, method).map(|n| Expr::UnaryAssign(Arc::new(n)))
    }

    /// Multi-dimensional array of `element` with the given bounds, initialized
    /// row-major from `initializers`.
    pub fn new_array_init(
        element: Type,
        bounds: impl IntoIterator<Item = i32>,
        initializers: Vec<Expr>,
    ) -> NodeResult<Expr> {
        let bounds: Vec<i32> = bounds.into_iter().collect();
        NewArrayInit::new(element, &bounds, initializers).map(|n| Expr::NewArrayInit(Arc::new(n)))
    }

    pub fn invoke(callee: Expr, bindings: Vec<ParameterBinding>) -> NodeResult<Expr> {
        Invocation::new(callee, bindings).map(|n| Expr::Invoke(Arc::new(n)))
    }

    // ── Introspection ──

    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Constant(_) => NodeKind::Constant,
            Expr::Variable(_) => NodeKind::Variable,
            Expr::Index(_) => NodeKind::Index,
            Expr::Binary(_) => NodeKind::Binary,
            Expr::Call(_) => NodeKind::Call,
            Expr::Assign(_) => NodeKind::Assign,
            Expr::Block(_) => NodeKind::Block,
            Expr::Lambda(_) => NodeKind::Lambda,
            Expr::Quote(_) => NodeKind::Quote,
            Expr::UnaryAssign(n) => n.kind().into(),
            Expr::NewArrayInit(_) => NodeKind::NewMultidimensionalArrayInit,
            Expr::Invoke(_) => NodeKind::Invoke,
        }
    }

    /// Static result type.
    pub fn ty(&self) -> Type {
        match self {
            Expr::Constant(c) => c.ty(),
            Expr::Variable(v) => v.ty.clone(),
            Expr::Index(n) => n.ty.clone(),
            Expr::Binary(n) => n.left.ty(),
            Expr::Call(n) => n.signature.return_type().clone(),
            Expr::Assign(n) => n.target.ty(),
            Expr::Block(n) => n.body.last().map(Expr::ty).unwrap_or(Type::Void),
            Expr::Lambda(n) => n.ty(),
            Expr::Quote(n) => Type::quoted(n.operand.ty()),
            Expr::UnaryAssign(n) => n.ty(),
            Expr::NewArrayInit(n) => n.ty(),
            Expr::Invoke(n) => n.ty(),
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<Expr> {
        match self {
            Expr::Constant(_) | Expr::Variable(_) => Vec::new(),
            Expr::Index(n) => std::iter::once(n.array.clone())
                .chain(n.indices.iter().cloned())
                .collect(),
            Expr::Binary(n) => vec![n.left.clone(), n.right.clone()],
            Expr::Call(n) => std::iter::once(n.callee.clone())
                .chain(n.args.iter().cloned())
                .collect(),
            Expr::Assign(n) => vec![n.target.clone(), n.value.clone()],
            Expr::Block(n) => n.body.clone(),
            Expr::Lambda(n) => vec![n.body.clone()],
            Expr::Quote(n) => vec![n.operand.clone()],
            Expr::UnaryAssign(n) => vec![n.operand().clone()],
            Expr::NewArrayInit(n) => n.elements().to_vec(),
            Expr::Invoke(n) => std::iter::once(n.callee().clone())
                .chain(n.bindings().iter().map(|b| b.value().clone()))
                .collect(),
        }
    }

    /// Identity comparison: the same shared node, or an equal leaf.
    pub fn same(&self, other: &Expr) -> bool {
        match (self, other) {
            (Expr::Constant(a), Expr::Constant(b)) => a.identical(b),
            (Expr::Variable(a), Expr::Variable(b)) => a == b,
            (Expr::Index(a), Expr::Index(b)) => Arc::ptr_eq(a, b),
            (Expr::Binary(a), Expr::Binary(b)) => Arc::ptr_eq(a, b),
            (Expr::Call(a), Expr::Call(b)) => Arc::ptr_eq(a, b),
            (Expr::Assign(a), Expr::Assign(b)) => Arc::ptr_eq(a, b),
            (Expr::Block(a), Expr::Block(b)) => Arc::ptr_eq(a, b),
            (Expr::Lambda(a), Expr::Lambda(b)) => Arc::ptr_eq(a, b),
            (Expr::Quote(a), Expr::Quote(b)) => Arc::ptr_eq(a, b),
            (Expr::UnaryAssign(a), Expr::UnaryAssign(b)) => Arc::ptr_eq(a, b),
            (Expr::NewArrayInit(a), Expr::NewArrayInit(b)) => Arc::ptr_eq(a, b),
            (Expr::Invoke(a), Expr::Invoke(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Variables and array elements can be written to.
    pub fn is_location(&self) -> bool {
        matches!(self, Expr::Variable(_) | Expr::Index(_))
    }
}

pub(crate) fn same_all(a: &[Expr], b: &[Expr]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
}

fn expect_assignable(expected: &Type, value: &Expr) -> NodeResult<()> {
    let found = value.ty();
    if expected.is_assignable_from(&found) {
        Ok(())
    } else {
        Err(NodeError::TypeMismatch {
            expected: expected.clone(),
            found,
        })
    }
}

// ── Mirrors of primitive forms ──

/// Array element `array[i0, i1, ...]`.
#[derive(Debug)]
pub struct IndexExpr {
    array: Expr,
    indices: Vec<Expr>,
    ty: Type,
}

impl IndexExpr {
    fn new(array: Expr, indices: Vec<Expr>) -> NodeResult<Self> {
        let array_ty = array.ty();
        let (element, rank) = array_ty
            .element_type()
            .ok_or_else(|| NodeError::NotAnArray(array_ty.clone()))?;
        if indices.len() != rank {
            return Err(NodeError::RankMismatch {
                expected: rank,
                found: indices.len(),
            });
        }
        for index in &indices {
            expect_assignable(&Type::I32, index)?;
        }
        let ty = element.clone();
        Ok(Self { array, indices, ty })
    }

    pub fn array(&self) -> &Expr {
        &self.array
    }

    pub fn indices(&self) -> &[Expr] {
        &self.indices
    }

    pub fn update(this: &Arc<Self>, array: Expr, indices: Vec<Expr>) -> NodeResult<Arc<Self>> {
        if array.same(&this.array) && same_all(&indices, &this.indices) {
            return Ok(Arc::clone(this));
        }
        Self::new(array, indices).map(Arc::new)
    }
}

#[derive(Debug)]
pub struct BinaryExpr {
    op: ArithOp,
    checked: bool,
    left: Expr,
    right: Expr,
}

impl BinaryExpr {
    fn new(op: ArithOp, checked: bool, left: Expr, right: Expr) -> NodeResult<Self> {
        let ty = left.ty();
        if !ty.is_arithmetic() {
            return Err(NodeError::OperatorNotDefined {
                kind: NodeKind::Binary,
                ty,
            });
        }
        if right.ty() != ty {
            return Err(NodeError::TypeMismatch {
                expected: ty,
                found: right.ty(),
            });
        }
        Ok(Self {
            op,
            checked,
            left,
            right,
        })
    }

    pub fn op(&self) -> ArithOp {
        self.op
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn left(&self) -> &Expr {
        &self.left
    }

    pub fn right(&self) -> &Expr {
        &self.right
    }

    pub fn update(this: &Arc<Self>, left: Expr, right: Expr) -> NodeResult<Arc<Self>> {
        if left.same(&this.left) && right.same(&this.right) {
            return Ok(Arc::clone(this));
        }
        Self::new(this.op, this.checked, left, right).map(Arc::new)
    }
}

/// Positional call.
#[derive(Debug)]
pub struct CallExpr {
    callee: Expr,
    args: Vec<Expr>,
    signature: Arc<Signature>,
}

impl CallExpr {
    fn new(callee: Expr, args: Vec<Expr>) -> NodeResult<Self> {
        let callee_ty = callee.ty();
        let signature = callee_ty
            .signature()
            .cloned()
            .ok_or_else(|| NodeError::NotCallable(callee_ty.clone()))?;
        if args.len() != signature.params().len() {
            return Err(NodeError::ArgumentCount {
                expected: signature.params().len(),
                found: args.len(),
            });
        }
        for (param, arg) in signature.params().iter().zip(&args) {
            expect_assignable(param.ty(), arg)?;
        }
        Ok(Self {
            callee,
            args,
            signature,
        })
    }

    pub fn callee(&self) -> &Expr {
        &self.callee
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    pub fn update(this: &Arc<Self>, callee: Expr, args: Vec<Expr>) -> NodeResult<Arc<Self>> {
        if callee.same(&this.callee) && same_all(&args, &this.args) {
            return Ok(Arc::clone(this));
        }
        Self::new(callee, args).map(Arc::new)
    }
}

#[derive(Debug)]
pub struct AssignExpr {
    target: Expr,
    value: Expr,
}

impl AssignExpr {
    fn new(target: Expr, value: Expr) -> NodeResult<Self> {
        if !target.is_location() {
            return Err(NodeError::NotAssignable(target.kind()));
        }
        expect_assignable(&target.ty(), &value)?;
        Ok(Self { target, value })
    }

    pub fn target(&self) -> &Expr {
        &self.target
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }

    pub fn update(this: &Arc<Self>, target: Expr, value: Expr) -> NodeResult<Arc<Self>> {
        if target.same(&this.target) && value.same(&this.value) {
            return Ok(Arc::clone(this));
        }
        Self::new(target, value).map(Arc::new)
    }
}

/// Sequence with scoped locals; yields its last expression.
#[derive(Debug)]
pub struct BlockExpr {
    locals: Vec<Var>,
    body: Vec<Expr>,
}

impl BlockExpr {
    fn new(locals: Vec<Var>, body: Vec<Expr>) -> NodeResult<Self> {
        if body.is_empty() {
            return Err(NodeError::MissingArgument("body"));
        }
        Ok(Self { locals, body })
    }

    pub fn locals(&self) -> &[Var] {
        &self.locals
    }

    pub fn body(&self) -> &[Expr] {
        &self.body
    }

    pub fn update(this: &Arc<Self>, body: Vec<Expr>) -> NodeResult<Arc<Self>> {
        if same_all(&body, &this.body) {
            return Ok(Arc::clone(this));
        }
        Self::new(this.locals.clone(), body).map(Arc::new)
    }
}

#[derive(Debug)]
pub struct LambdaExpr {
    signature: Arc<Signature>,
    params: Vec<Var>,
    body: Expr,
}

impl LambdaExpr {
    fn new(signature: Arc<Signature>, params: Vec<Var>, body: Expr) -> NodeResult<Self> {
        if params.len() != signature.params().len() {
            return Err(NodeError::ArgumentCount {
                expected: signature.params().len(),
                found: params.len(),
            });
        }
        for (declared, var) in signature.params().iter().zip(&params) {
            if *declared.ty() != var.ty {
                return Err(NodeError::TypeMismatch {
                    expected: declared.ty().clone(),
                    found: var.ty.clone(),
                });
            }
        }
        let ret = signature.return_type();
        if *ret != Type::Void {
            expect_assignable(ret, &body)?;
        }
        Ok(Self {
            signature,
            params,
            body,
        })
    }

    pub fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    pub fn params(&self) -> &[Var] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn ty(&self) -> Type {
        Type::Fn(self.signature.clone())
    }

    pub fn update(this: &Arc<Self>, body: Expr) -> NodeResult<Arc<Self>> {
        if body.same(&this.body) {
            return Ok(Arc::clone(this));
        }
        Self::new(this.signature.clone(), this.params.clone(), body).map(Arc::new)
    }
}

/// A lambda kept as data rather than as a callable value.
#[derive(Debug)]
pub struct QuoteExpr {
    operand: Expr,
}

impl QuoteExpr {
    fn new(operand: Expr) -> NodeResult<Self> {
        match operand {
            Expr::Lambda(_) => Ok(Self { operand }),
            other => Err(NodeError::NotALambda(other.kind())),
        }
    }

    pub fn operand(&self) -> &Expr {
        &self.operand
    }

    pub fn update(this: &Arc<Self>, operand: Expr) -> NodeResult<Arc<Self>> {
        if operand.same(&this.operand) {
            return Ok(Arc::clone(this));
        }
        Self::new(operand).map(Arc::new)
    }
}
