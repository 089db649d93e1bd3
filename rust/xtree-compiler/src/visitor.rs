//! Rewriting traversal over extended expression trees.
//!
//! [`Visitor::visit`] dispatches on the node variant to one hook per kind.
//! Every hook defaults to the matching `walk_*` function, which visits the
//! children in declared (evaluation) order and rebuilds the node through its
//! `update`, so a subtree nobody changed comes back as the very same `Arc`.
//! An override that wants the default behavior for children calls the
//! `walk_*` function itself.
//!
//! Traversal recurses once per tree level. Trees from untrusted sources should
//! be lowered with a bounded [`crate::LowerOptions::max_depth`], which fails
//! cleanly instead of exhausting the stack.

use crate::error::NodeResult;
use crate::ir::{
    AssignExpr, BinaryExpr, BlockExpr, CallExpr, Expr, IndexExpr, Invocation, LambdaExpr,
    NewArrayInit, ParameterBinding, QuoteExpr, UnaryAssign,
};
use std::sync::Arc;
use xtree_core::{Constant, Var};

pub trait Visitor {
    fn visit(&mut self, expr: &Expr) -> NodeResult<Expr> {
        match expr {
            Expr::Constant(value) => self.visit_constant(value),
            Expr::Variable(var) => self.visit_variable(var),
            Expr::Index(node) => self.visit_index(node),
            Expr::Binary(node) => self.visit_binary(node),
            Expr::Call(node) => self.visit_call(node),
            Expr::Assign(node) => self.visit_assign(node),
            Expr::Block(node) => self.visit_block(node),
            Expr::Lambda(node) => self.visit_lambda(node),
            Expr::Quote(node) => self.visit_quote(node),
            Expr::UnaryAssign(node) => self.visit_unary_assign(node),
            Expr::NewArrayInit(node) => self.visit_new_array_init(node),
            Expr::Invoke(node) => self.visit_invoke(node),
        }
    }

    fn visit_constant(&mut self, value: &Constant) -> NodeResult<Expr> {
        Ok(Expr::Constant(value.clone()))
    }

    fn visit_variable(&mut self, var: &Var) -> NodeResult<Expr> {
        Ok(Expr::Variable(var.clone()))
    }

    fn visit_index(&mut self, node: &Arc<IndexExpr>) -> NodeResult<Expr> {
        walk_index(self, node)
    }

    fn visit_binary(&mut self, node: &Arc<BinaryExpr>) -> NodeResult<Expr> {
        walk_binary(self, node)
    }

    fn visit_call(&mut self, node: &Arc<CallExpr>) -> NodeResult<Expr> {
        walk_call(self, node)
    }

    fn visit_assign(&mut self, node: &Arc<AssignExpr>) -> NodeResult<Expr> {
        walk_assign(self, node)
    }

    fn visit_block(&mut self, node: &Arc<BlockExpr>) -> NodeResult<Expr> {
        walk_block(self, node)
    }

    fn visit_lambda(&mut self, node: &Arc<LambdaExpr>) -> NodeResult<Expr> {
        walk_lambda(self, node)
    }

    fn visit_quote(&mut self, node: &Arc<QuoteExpr>) -> NodeResult<Expr> {
        walk_quote(self, node)
    }

    fn visit_unary_assign(&mut self, node: &Arc<UnaryAssign>) -> NodeResult<Expr> {
        walk_unary_assign(self, node)
    }

    fn visit_new_array_init(&mut self, node: &Arc<NewArrayInit>) -> NodeResult<Expr> {
        walk_new_array_init(self, node)
    }

    fn visit_invoke(&mut self, node: &Arc<Invocation>) -> NodeResult<Expr> {
        walk_invoke(self, node)
    }

    fn visit_binding(&mut self, binding: &ParameterBinding) -> NodeResult<ParameterBinding> {
        walk_binding(self, binding)
    }
}

/// Visit each expression in order.
pub fn visit_all<V: Visitor + ?Sized>(visitor: &mut V, exprs: &[Expr]) -> NodeResult<Vec<Expr>> {
    exprs.iter().map(|e| visitor.visit(e)).collect()
}

pub fn walk_index<V: Visitor + ?Sized>(visitor: &mut V, node: &Arc<IndexExpr>) -> NodeResult<Expr> {
    let array = visitor.visit(node.array())?;
    let indices = visit_all(visitor, node.indices())?;
    IndexExpr::update(node, array, indices).map(Expr::Index)
}

pub fn walk_binary<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<BinaryExpr>,
) -> NodeResult<Expr> {
    let left = visitor.visit(node.left())?;
    let right = visitor.visit(node.right())?;
    BinaryExpr::update(node, left, right).map(Expr::Binary)
}

pub fn walk_call<V: Visitor + ?Sized>(visitor: &mut V, node: &Arc<CallExpr>) -> NodeResult<Expr> {
    let callee = visitor.visit(node.callee())?;
    let args = visit_all(visitor, node.args())?;
    CallExpr::update(node, callee, args).map(Expr::Call)
}

pub fn walk_assign<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<AssignExpr>,
) -> NodeResult<Expr> {
    let target = visitor.visit(node.target())?;
    let value = visitor.visit(node.value())?;
    AssignExpr::update(node, target, value).map(Expr::Assign)
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, node: &Arc<BlockExpr>) -> NodeResult<Expr> {
    let body = visit_all(visitor, node.body())?;
    BlockExpr::update(node, body).map(Expr::Block)
}

pub fn walk_lambda<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<LambdaExpr>,
) -> NodeResult<Expr> {
    let body = visitor.visit(node.body())?;
    LambdaExpr::update(node, body).map(Expr::Lambda)
}

pub fn walk_quote<V: Visitor + ?Sized>(visitor: &mut V, node: &Arc<QuoteExpr>) -> NodeResult<Expr> {
    let operand = visitor.visit(node.operand())?;
    QuoteExpr::update(node, operand).map(Expr::Quote)
}

pub fn walk_unary_assign<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<UnaryAssign>,
) -> NodeResult<Expr> {
    let operand = visitor.visit(node.operand())?;
    UnaryAssign::update(node, operand).map(Expr::UnaryAssign)
}

pub fn walk_new_array_init<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<NewArrayInit>,
) -> NodeResult<Expr> {
    let elements = visit_all(visitor, node.elements())?;
    NewArrayInit::update(node, elements).map(Expr::NewArrayInit)
}

pub fn walk_invoke<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Invocation>,
) -> NodeResult<Expr> {
    let callee = visitor.visit(node.callee())?;
    let bindings = node
        .bindings()
        .iter()
        .map(|b| visitor.visit_binding(b))
        .collect::<NodeResult<Vec<_>>>()?;
    Invocation::update(node, callee, bindings).map(Expr::Invoke)
}

pub fn walk_binding<V: Visitor + ?Sized>(
    visitor: &mut V,
    binding: &ParameterBinding,
) -> NodeResult<ParameterBinding> {
    let value = visitor.visit(binding.value())?;
    binding.update(value)
}
