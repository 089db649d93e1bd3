//! Arithmetic on runtime values.

use super::VmError;
use crate::values::Value;
use num_traits::{CheckedAdd, CheckedMul, CheckedSub, Float, WrappingAdd, WrappingMul, WrappingSub};
use tracing::debug;
use xtree_core::ArithOp;

/// Apply `op` to two values of the same numeric type. A null operand makes
/// the result null. Only checked integer arithmetic can fail with
/// [`VmError::ArithmeticOverflow`]; unchecked integers wrap and floats follow
/// IEEE rules either way.
pub(crate) fn binary(
    op: ArithOp,
    checked: bool,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, VmError> {
    match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::U8(a), Value::U8(b)) => int_op(op, checked, *a, *b).map(Value::U8),
        (Value::I8(a), Value::I8(b)) => int_op(op, checked, *a, *b).map(Value::I8),
        (Value::U16(a), Value::U16(b)) => int_op(op, checked, *a, *b).map(Value::U16),
        (Value::I16(a), Value::I16(b)) => int_op(op, checked, *a, *b).map(Value::I16),
        (Value::U32(a), Value::U32(b)) => int_op(op, checked, *a, *b).map(Value::U32),
        (Value::I32(a), Value::I32(b)) => int_op(op, checked, *a, *b).map(Value::I32),
        (Value::U64(a), Value::U64(b)) => int_op(op, checked, *a, *b).map(Value::U64),
        (Value::I64(a), Value::I64(b)) => int_op(op, checked, *a, *b).map(Value::I64),
        (Value::F32(a), Value::F32(b)) => Ok(Value::F32(float_op(op, *a, *b))),
        (Value::F64(a), Value::F64(b)) => Ok(Value::F64(float_op(op, *a, *b))),
        _ => Err(VmError::TypeError(format!(
            "cannot {} {} and {}",
            op,
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

/// The value `1` of the same numeric type as `value`.
pub(crate) fn one_like(value: &Value) -> Result<Value, VmError> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::U8(_) => Value::U8(1),
        Value::I8(_) => Value::I8(1),
        Value::U16(_) => Value::U16(1),
        Value::I16(_) => Value::I16(1),
        Value::U32(_) => Value::U32(1),
        Value::I32(_) => Value::I32(1),
        Value::U64(_) => Value::U64(1),
        Value::I64(_) => Value::I64(1),
        Value::F32(_) => Value::F32(1.0),
        Value::F64(_) => Value::F64(1.0),
        other => {
            return Err(VmError::TypeError(format!(
                "cannot increment or decrement {}",
                other.type_name()
            )))
        }
    })
}

fn int_op<T>(op: ArithOp, checked: bool, a: T, b: T) -> Result<T, VmError>
where
    T: CheckedAdd + CheckedSub + CheckedMul + WrappingAdd + WrappingSub + WrappingMul,
{
    if !checked {
        return Ok(match op {
            ArithOp::Add => a.wrapping_add(&b),
            ArithOp::Sub => a.wrapping_sub(&b),
            ArithOp::Mul => a.wrapping_mul(&b),
        });
    }
    let result = match op {
        ArithOp::Add => a.checked_add(&b),
        ArithOp::Sub => a.checked_sub(&b),
        ArithOp::Mul => a.checked_mul(&b),
    };
    result.ok_or_else(|| {
        debug!(%op, "checked arithmetic overflow");
        VmError::ArithmeticOverflow
    })
}

fn float_op<T: Float>(op: ArithOp, a: T, b: T) -> T {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
    }
}
