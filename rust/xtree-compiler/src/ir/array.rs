//! Multi-dimensional array construction with an initializer list.

use super::{same_all, Expr};
use crate::error::{NodeError, NodeResult};
use std::sync::Arc;
use xtree_core::Type;

/// `new T[,] { { a, b }, { c, d } }`: elements stored flat in row-major order.
#[derive(Debug)]
pub struct NewArrayInit {
    element: Type,
    bounds: Vec<usize>,
    elements: Vec<Expr>,
}

impl NewArrayInit {
    pub(crate) fn new(element: Type, bounds: &[i32], initializers: Vec<Expr>) -> NodeResult<Self> {
        if element == Type::Void {
            return Err(NodeError::VoidElementType);
        }
        if bounds.is_empty() {
            return Err(NodeError::EmptyBounds);
        }

        let mut checked_bounds = Vec::with_capacity(bounds.len());
        let mut length: usize = 1;
        for (dimension, &bound) in bounds.iter().enumerate() {
            let bound = usize::try_from(bound)
                .map_err(|_| NodeError::BoundNegative { dimension, bound })?;
            length = length
                .checked_mul(bound)
                .ok_or(NodeError::BoundsOverflow)?;
            checked_bounds.push(bound);
        }

        if initializers.len() != length {
            return Err(NodeError::ElementCountMismatch {
                expected: length,
                found: initializers.len(),
            });
        }

        // Copy-on-write: the caller's list is kept unless an element needs quoting.
        let mut converted: Option<Vec<Expr>> = None;
        for (position, initializer) in initializers.iter().enumerate() {
            let found = initializer.ty();
            if element.is_assignable_from(&found) {
                if let Some(list) = converted.as_mut() {
                    list.push(initializer.clone());
                }
                continue;
            }
            let quoted = try_quote(&element, initializer).ok_or_else(|| {
                NodeError::ElementTypeIncompatible {
                    position,
                    element: found,
                    expected: element.clone(),
                }
            })?;
            converted
                .get_or_insert_with(|| initializers[..position].to_vec())
                .push(quoted);
        }

        Ok(Self {
            element,
            bounds: checked_bounds,
            elements: converted.unwrap_or(initializers),
        })
    }

    pub fn element_type(&self) -> &Type {
        &self.element
    }

    pub fn bounds(&self) -> &[usize] {
        &self.bounds
    }

    pub fn rank(&self) -> usize {
        self.bounds.len()
    }

    pub fn elements(&self) -> &[Expr] {
        &self.elements
    }

    pub fn ty(&self) -> Type {
        Type::array(self.element.clone(), self.rank())
    }

    /// Initializer at the given multi-index (row-major).
    pub fn get_element(&self, indices: &[i32]) -> NodeResult<&Expr> {
        if indices.len() != self.rank() {
            return Err(NodeError::RankMismatch {
                expected: self.rank(),
                found: indices.len(),
            });
        }
        let mut linear = 0usize;
        for (dimension, (&index, &bound)) in indices.iter().zip(&self.bounds).enumerate() {
            let idx = usize::try_from(index)
                .ok()
                .filter(|&i| i < bound)
                .ok_or(NodeError::IndexOutOfRange {
                    dimension,
                    index,
                    bound,
                })?;
            linear = linear * bound + idx;
        }
        Ok(&self.elements[linear])
    }

    pub fn update(this: &Arc<Self>, elements: Vec<Expr>) -> NodeResult<Arc<Self>> {
        if same_all(&elements, &this.elements) {
            return Ok(Arc::clone(this));
        }
        let bounds: Vec<i32> = this.bounds.iter().map(|&b| b as i32).collect();
        Self::new(this.element.clone(), &bounds, elements).map(Arc::new)
    }
}

/// Lambdas stored into a quoted-code slot are wrapped in a `Quote`.
fn try_quote(element: &Type, initializer: &Expr) -> Option<Expr> {
    let Type::Quoted(inner) = element else {
        return None;
    };
    match initializer {
        Expr::Lambda(lambda) if lambda.ty() == **inner => Expr::quote(initializer.clone()).ok(),
        _ => None,
    }
}

/// Incremental construction of a [`NewArrayInit`]; every part is required.
#[derive(Debug, Default)]
pub struct ArrayInitBuilder {
    element: Option<Type>,
    bounds: Option<Vec<i32>>,
    initializers: Option<Vec<Expr>>,
}

impl ArrayInitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element_type(mut self, element: Type) -> Self {
        self.element = Some(element);
        self
    }

    pub fn bounds(mut self, bounds: impl IntoIterator<Item = i32>) -> Self {
        self.bounds = Some(bounds.into_iter().collect());
        self
    }

    pub fn initializers(mut self, initializers: Vec<Expr>) -> Self {
        self.initializers = Some(initializers);
        self
    }

    pub fn build(self) -> NodeResult<Expr> {
        let element = self.element.ok_or(NodeError::MissingArgument("element_type"))?;
        let bounds = self.bounds.ok_or(NodeError::MissingArgument("bounds"))?;
        let initializers = self
            .initializers
            .ok_or(NodeError::MissingArgument("initializers"))?;
        Expr::new_array_init(element, bounds, initializers)
    }
}
