use super::{Lowerer, Spill};
use crate::error::LowerError;
use crate::ir::{Expr, LoweringStrategy, UnaryAssign, UnaryAssignKind};
use tracing::debug;
use xtree_core::{Constant, Place, Prim, Type};

impl Lowerer {
    pub(super) fn lower_unary_assign(&mut self, node: &UnaryAssign) -> Result<Prim, LowerError> {
        let strategy = node.strategy();
        // A user operator runs arbitrary code between the read and the store,
        // so every non-constant part of the location is pinned first.
        let pin = matches!(strategy, LoweringStrategy::UserOperator(_));
        let mut spill = Spill::default();
        let place = self.lower_location(node.operand(), &mut spill, pin)?;

        match strategy {
            LoweringStrategy::Primitive(op) => {
                Ok(spill.finish(Prim::UnaryAssign { op, target: place }))
            }
            LoweringStrategy::Checked => {
                let ty = node.ty();
                let one = Constant::one(&ty)
                    .ok_or(LowerError::Unreachable("checked operand is not numeric"))?;
                let op = node.kind().inc_dec().arith();
                Ok(functional_assign(node.kind(), ty, place, spill, |old| {
                    Prim::Arith {
                        op,
                        checked: true,
                        left: Box::new(old),
                        right: Box::new(Prim::Const(one)),
                    }
                }))
            }
            LoweringStrategy::UserOperator(method) => {
                debug!(
                    method = %method,
                    kind = %node.node_kind(),
                    "lowering through user operator"
                );
                Ok(functional_assign(node.kind(), node.ty(), place, spill, |old| {
                    Prim::CallMethod {
                        method: method.clone(),
                        args: vec![old],
                    }
                }))
            }
        }
    }

    /// The operand as a [`Place`] whose parts are safe to evaluate again.
    ///
    /// A variable, or an element whose array and indices are all trivial, is
    /// used directly unless `pin` is set. Otherwise the array and each
    /// non-constant index are stored to temporaries in source order.
    fn lower_location(
        &mut self,
        operand: &Expr,
        spill: &mut Spill,
        pin: bool,
    ) -> Result<Place, LowerError> {
        let node = match operand {
            Expr::Variable(var) => return Ok(Place::Var(var.clone())),
            Expr::Index(node) => node,
            _ => return Err(LowerError::Unreachable("unary assignment operand is not a location")),
        };

        let array = self.lower(node.array())?;
        let indices = self.lower_all(node.indices())?;
        if !pin && array.is_trivial() && indices.iter().all(Prim::is_trivial) {
            return Ok(Place::Element {
                array: Box::new(array),
                indices,
            });
        }

        debug!(rank = indices.len(), pin, "spilling indexed operand");
        let array = spill.keep("__array", node.array().ty(), array);
        let indices = indices
            .into_iter()
            .zip(node.indices())
            .enumerate()
            .map(|(i, (index, expr))| spill.keep(&format!("__index{i}"), expr.ty(), index))
            .collect();
        Ok(Place::Element {
            array: Box::new(array),
            indices,
        })
    }
}

/// `old = place; new = step(old); place = new;` yielding `old` for postfix
/// kinds and `new` for prefix ones.
fn functional_assign(
    kind: UnaryAssignKind,
    ty: Type,
    place: Place,
    mut spill: Spill,
    step: impl FnOnce(Prim) -> Prim,
) -> Prim {
    let old = spill.push("__old", ty.clone(), place.read());
    let new = spill.push("__new", ty, step(old.clone()));
    spill.stores.push(Prim::assign(place, new.clone()));
    spill.finish(if kind.is_prefix() { new } else { old })
}
