//! Extended tree → primitive IR lowering.
//!
//! The output is a [`Prim`], which has no variant for any extended node, so a
//! successful lowering is complete by construction. Extended nodes that read
//! a value more than once go through block-scoped temporaries to keep every
//! source subexpression evaluated exactly once and in source order.

mod array;
mod invoke;
mod unary;

use crate::error::LowerError;
use crate::ir::{Expr, LambdaExpr};
use crate::options::LowerOptions;
use crate::visitor::Visitor;
use crate::Error;
use std::sync::Arc;
use tracing::{debug, trace};
use xtree_core::{Place, Prim, PrimLambda, Type, Var};

/// Lower `expr` with default options.
pub fn lower(expr: &Expr) -> Result<Prim, LowerError> {
    Lowerer::new(LowerOptions::default()).lower(expr)
}

/// Run `visitor` over `expr`, then lower the rewritten tree.
pub fn lower_with<V: Visitor + ?Sized>(
    visitor: &mut V,
    expr: &Expr,
    options: LowerOptions,
) -> Result<Prim, Error> {
    let rewritten = visitor.visit(expr)?;
    debug!(
        kind = %rewritten.kind(),
        rewritten = !rewritten.same(expr),
        "lowering visited tree"
    );
    Ok(Lowerer::new(options).lower(&rewritten)?)
}

#[derive(Debug, Clone, Default)]
pub struct Lowerer {
    options: LowerOptions,
    depth: usize,
}

impl Lowerer {
    pub fn new(options: LowerOptions) -> Self {
        Self { options, depth: 0 }
    }

    pub fn options(&self) -> &LowerOptions {
        &self.options
    }

    pub fn lower(&mut self, expr: &Expr) -> Result<Prim, LowerError> {
        if self.depth >= self.options.max_depth {
            debug!(max_depth = self.options.max_depth, "lowering depth limit reached");
            return Err(LowerError::DepthLimitExceeded(self.options.max_depth));
        }
        self.depth += 1;
        let result = self.lower_node(expr);
        self.depth -= 1;
        result
    }

    fn lower_all(&mut self, exprs: &[Expr]) -> Result<Vec<Prim>, LowerError> {
        exprs.iter().map(|e| self.lower(e)).collect()
    }

    fn lower_node(&mut self, expr: &Expr) -> Result<Prim, LowerError> {
        trace!(kind = %expr.kind(), depth = self.depth, "lower");
        match expr {
            Expr::Constant(value) => Ok(Prim::Const(value.clone())),
            Expr::Variable(var) => Ok(Prim::Read(var.clone())),
            Expr::Index(node) => Ok(Prim::Element {
                array: Box::new(self.lower(node.array())?),
                indices: self.lower_all(node.indices())?,
            }),
            Expr::Binary(node) => Ok(Prim::Arith {
                op: node.op(),
                checked: node.is_checked(),
                left: Box::new(self.lower(node.left())?),
                right: Box::new(self.lower(node.right())?),
            }),
            Expr::Call(node) => Ok(Prim::Call {
                callee: Box::new(self.lower(node.callee())?),
                args: self.lower_all(node.args())?,
            }),
            Expr::Assign(node) => {
                let target = self.lower_place(node.target())?;
                let value = self.lower(node.value())?;
                Ok(Prim::assign(target, value))
            }
            Expr::Block(node) => Ok(Prim::Block {
                locals: node.locals().to_vec(),
                body: self.lower_all(node.body())?,
            }),
            Expr::Lambda(node) => Ok(Prim::Lambda(Arc::new(self.lower_lambda(node)?))),
            Expr::Quote(node) => match node.operand() {
                Expr::Lambda(lambda) => Ok(Prim::Quote(Arc::new(self.lower_lambda(lambda)?))),
                _ => Err(LowerError::Unreachable("quoted operand is not a lambda")),
            },
            Expr::UnaryAssign(node) => self.lower_unary_assign(node),
            Expr::NewArrayInit(node) => self.lower_new_array_init(node),
            Expr::Invoke(node) => self.lower_invoke(node),
        }
    }

    fn lower_lambda(&mut self, node: &LambdaExpr) -> Result<PrimLambda, LowerError> {
        Ok(PrimLambda {
            signature: node.signature().clone(),
            params: node.params().to_vec(),
            body: self.lower(node.body())?,
        })
    }

    /// Storage location for an assignment target, children lowered in place.
    fn lower_place(&mut self, target: &Expr) -> Result<Place, LowerError> {
        match target {
            Expr::Variable(var) => Ok(Place::Var(var.clone())),
            Expr::Index(node) => Ok(Place::Element {
                array: Box::new(self.lower(node.array())?),
                indices: self.lower_all(node.indices())?,
            }),
            _ => Err(LowerError::Unreachable("assignment target is not a location")),
        }
    }
}

/// Temporaries introduced while lowering one node, plus the stores that
/// initialize them, in evaluation order.
#[derive(Debug, Default)]
struct Spill {
    locals: Vec<Var>,
    stores: Vec<Prim>,
}

impl Spill {
    /// Evaluate `value` into a fresh temporary; returns a read of it.
    fn push(&mut self, name: &str, ty: Type, value: Prim) -> Prim {
        let tmp = Var::new(name, ty);
        self.stores
            .push(Prim::assign(Place::Var(tmp.clone()), value));
        self.locals.push(tmp.clone());
        Prim::Read(tmp)
    }

    /// Like [`Spill::push`], but constants are used as they are.
    fn keep(&mut self, name: &str, ty: Type, value: Prim) -> Prim {
        match value {
            Prim::Const(_) => value,
            value => self.push(name, ty, value),
        }
    }

    fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// The stores followed by `tail`, or just `tail` when nothing was spilled.
    fn finish(self, tail: Prim) -> Prim {
        if self.is_empty() {
            return tail;
        }
        let mut body = self.stores;
        body.push(tail);
        Prim::Block {
            locals: self.locals,
            body,
        }
    }
}
