use super::Lowerer;
use crate::error::LowerError;
use crate::ir::{Expr, NewArrayInit};
use tracing::debug;
use xtree_core::{Constant, Place, Prim, Var};

impl Lowerer {
    pub(super) fn lower_new_array_init(&mut self, node: &NewArrayInit) -> Result<Prim, LowerError> {
        if self.options.fold_constant_arrays {
            if let Some(values) = constant_elements(node.elements()) {
                debug!(bounds = ?node.bounds(), "folding constant array");
                return Ok(Prim::ConstArray {
                    element: node.element_type().clone(),
                    bounds: node.bounds().to_vec(),
                    values,
                });
            }
        }

        let array = Var::new("__array", node.ty());
        let bounds = node
            .bounds()
            .iter()
            .map(|&b| index_constant(b))
            .collect::<Result<Vec<_>, _>>()?;

        let mut body = Vec::with_capacity(node.elements().len() + 2);
        body.push(Prim::assign(
            Place::Var(array.clone()),
            Prim::NewArrayBounds {
                element: node.element_type().clone(),
                bounds,
            },
        ));

        let mut index = vec![0usize; node.rank()];
        for (linear, element) in node.elements().iter().enumerate() {
            unflatten(linear, node.bounds(), &mut index);
            let target = Place::Element {
                array: Box::new(Prim::Read(array.clone())),
                indices: index
                    .iter()
                    .map(|&i| index_constant(i))
                    .collect::<Result<_, _>>()?,
            };
            body.push(Prim::assign(target, self.lower(element)?));
        }

        body.push(Prim::Read(array.clone()));
        Ok(Prim::Block {
            locals: vec![array],
            body,
        })
    }
}

fn constant_elements(elements: &[Expr]) -> Option<Vec<Constant>> {
    elements
        .iter()
        .map(|e| match e {
            Expr::Constant(c) => Some(c.clone()),
            _ => None,
        })
        .collect()
}

fn index_constant(n: usize) -> Result<Prim, LowerError> {
    i32::try_from(n)
        .map(|n| Prim::Const(Constant::I32(n)))
        .map_err(|_| LowerError::Unreachable("array bound exceeds i32"))
}

/// Row-major multi-index of the `linear`-th element: divide by the bounds
/// starting from the last dimension.
pub(crate) fn unflatten(mut linear: usize, bounds: &[usize], out: &mut [usize]) {
    for (slot, &bound) in out.iter_mut().zip(bounds).rev() {
        *slot = linear % bound;
        linear /= bound;
    }
}
