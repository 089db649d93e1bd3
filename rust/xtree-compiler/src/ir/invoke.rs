//! Invocation with arguments bound to parameters by descriptor.

use super::Expr;
use crate::error::{NodeError, NodeResult};
use std::sync::Arc;
use xtree_core::{Constant, Parameter, Signature, Type};

/// A value bound to one parameter of the callee.
#[derive(Debug, Clone)]
pub struct ParameterBinding {
    parameter: Arc<Parameter>,
    value: Expr,
}

impl ParameterBinding {
    pub fn new(parameter: Arc<Parameter>, value: Expr) -> NodeResult<Self> {
        let found = value.ty();
        if !parameter.ty().is_assignable_from(&found) {
            return Err(NodeError::TypeMismatch {
                expected: parameter.ty().clone(),
                found,
            });
        }
        Ok(Self { parameter, value })
    }

    pub fn parameter(&self) -> &Arc<Parameter> {
        &self.parameter
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }

    pub fn same(&self, other: &ParameterBinding) -> bool {
        self.parameter.same(&other.parameter) && self.value.same(&other.value)
    }

    pub fn update(&self, value: Expr) -> NodeResult<ParameterBinding> {
        if value.same(&self.value) {
            return Ok(self.clone());
        }
        Self::new(self.parameter.clone(), value)
    }
}

/// Where a declared parameter's argument comes from.
#[derive(Debug, Clone, Copy)]
pub enum ArgumentSlot<'a> {
    /// Supplied by the binding at this index of [`Invocation::bindings`].
    Bound(usize),
    /// Omitted; filled with the parameter's default.
    Default(&'a Constant),
}

/// `f(y: b, x: a)`: bindings keep the caller's order, which is also the
/// order their values are evaluated in.
#[derive(Debug)]
pub struct Invocation {
    callee: Expr,
    bindings: Vec<ParameterBinding>,
    signature: Arc<Signature>,
}

impl Invocation {
    pub(crate) fn new(callee: Expr, bindings: Vec<ParameterBinding>) -> NodeResult<Self> {
        let callee_ty = callee.ty();
        let signature = callee_ty
            .signature()
            .cloned()
            .ok_or_else(|| NodeError::NotCallable(callee_ty.clone()))?;

        let mut bound = vec![false; signature.params().len()];
        for binding in &bindings {
            let parameter = binding.parameter();
            if signature.declared(parameter).is_none() {
                return Err(NodeError::WrongCalleeMember {
                    parameter: parameter.name().to_string(),
                    callee: signature.name().to_string(),
                });
            }
            if std::mem::replace(&mut bound[parameter.position()], true) {
                return Err(NodeError::DuplicateParameterBinding {
                    parameter: parameter.name().to_string(),
                });
            }
        }

        if let Some(missing) = signature
            .params()
            .iter()
            .zip(&bound)
            .find(|(param, is_bound)| !**is_bound && !param.is_optional())
        {
            return Err(NodeError::UnboundRequiredParameter {
                parameter: missing.0.name().to_string(),
            });
        }

        Ok(Self {
            callee,
            bindings,
            signature,
        })
    }

    pub fn callee(&self) -> &Expr {
        &self.callee
    }

    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    pub fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    pub fn ty(&self) -> Type {
        self.signature.return_type().clone()
    }

    /// One slot per declared parameter, in declaration order.
    pub fn slots(&self) -> NodeResult<Vec<ArgumentSlot<'_>>> {
        self.signature
            .params()
            .iter()
            .map(|param| {
                match self
                    .bindings
                    .iter()
                    .position(|b| b.parameter().position() == param.position())
                {
                    Some(index) => Ok(ArgumentSlot::Bound(index)),
                    None => param
                        .default()
                        .map(ArgumentSlot::Default)
                        .ok_or(NodeError::Unreachable("required parameter left unbound")),
                }
            })
            .collect()
    }

    /// Whether binding order already matches declaration order.
    pub fn is_in_declaration_order(&self) -> bool {
        self.bindings
            .windows(2)
            .all(|w| w[0].parameter().position() < w[1].parameter().position())
    }

    pub fn update(
        this: &Arc<Self>,
        callee: Expr,
        bindings: Vec<ParameterBinding>,
    ) -> NodeResult<Arc<Self>> {
        let same_bindings = bindings.len() == this.bindings.len()
            && bindings.iter().zip(&this.bindings).all(|(a, b)| a.same(b));
        if callee.same(&this.callee) && same_bindings {
            return Ok(Arc::clone(this));
        }
        Self::new(callee, bindings).map(Arc::new)
    }
}

/// Incremental construction of an [`Invocation`].
#[derive(Debug, Default)]
pub struct InvocationBuilder {
    callee: Option<Expr>,
    bindings: Option<Vec<ParameterBinding>>,
}

impl InvocationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callee(mut self, callee: Expr) -> Self {
        self.callee = Some(callee);
        self
    }

    pub fn binding(mut self, binding: ParameterBinding) -> Self {
        self.bindings.get_or_insert_with(Vec::new).push(binding);
        self
    }

    pub fn bindings(mut self, bindings: impl IntoIterator<Item = ParameterBinding>) -> Self {
        self.bindings
            .get_or_insert_with(Vec::new)
            .extend(bindings);
        self
    }

    pub fn build(self) -> NodeResult<Expr> {
        let callee = self.callee.ok_or(NodeError::MissingArgument("callee"))?;
        let bindings = self.bindings.ok_or(NodeError::MissingArgument("bindings"))?;
        Expr::invoke(callee, bindings)
    }
}
