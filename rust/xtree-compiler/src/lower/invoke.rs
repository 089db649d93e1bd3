use super::{Lowerer, Spill};
use crate::error::LowerError;
use crate::ir::{ArgumentSlot, Invocation};
use tracing::debug;
use xtree_core::Prim;

impl Lowerer {
    /// Callee first, then binding values in binding order; the call itself
    /// receives arguments in declaration order with defaults filled in.
    pub(super) fn lower_invoke(&mut self, node: &Invocation) -> Result<Prim, LowerError> {
        let slots = node
            .slots()
            .map_err(|_| LowerError::Unreachable("invocation left a required parameter unbound"))?;
        let callee = self.lower(node.callee())?;
        let values = node
            .bindings()
            .iter()
            .map(|b| self.lower(b.value()))
            .collect::<Result<Vec<_>, _>>()?;

        if node.is_in_declaration_order() {
            return Ok(Prim::Call {
                callee: Box::new(callee),
                args: arrange(&slots, values)?,
            });
        }

        debug!(
            callee = %node.signature().name(),
            bindings = node.bindings().len(),
            "spilling out-of-order arguments"
        );
        let mut spill = Spill::default();
        let callee = spill.keep("__callee", node.callee().ty(), callee);
        let values = node
            .bindings()
            .iter()
            .zip(values)
            .map(|(binding, value)| {
                let name = format!("__arg_{}", binding.parameter().name());
                spill.keep(&name, binding.value().ty(), value)
            })
            .collect();
        Ok(spill.finish(Prim::Call {
            callee: Box::new(callee),
            args: arrange(&slots, values)?,
        }))
    }
}

/// Lay binding values out in declaration order.
fn arrange(slots: &[ArgumentSlot<'_>], values: Vec<Prim>) -> Result<Vec<Prim>, LowerError> {
    let mut values: Vec<Option<Prim>> = values.into_iter().map(Some).collect();
    slots
        .iter()
        .map(|slot| match *slot {
            ArgumentSlot::Bound(i) => values
                .get_mut(i)
                .and_then(Option::take)
                .ok_or(LowerError::Unreachable("binding consumed twice")),
            ArgumentSlot::Default(value) => Ok(Prim::Const(value.clone())),
        })
        .collect()
}
