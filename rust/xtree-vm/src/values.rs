//! Runtime values for the xtree evaluator.

use crate::vm::{Scope, VmError};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use xtree_core::{Constant, PrimLambda, Type};

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(Rc<str>),
    /// Arrays have reference semantics.
    Array(Rc<RefCell<MdArray>>),
    Function(Function),
    /// A quoted lambda, kept as code.
    Quoted(Arc<PrimLambda>),
}

impl Value {
    /// The value a fresh local or array slot of type `ty` starts with.
    pub fn default_for(ty: &Type) -> Value {
        match ty {
            Type::Bool => Value::Bool(false),
            Type::U8 => Value::U8(0),
            Type::I8 => Value::I8(0),
            Type::U16 => Value::U16(0),
            Type::I16 => Value::I16(0),
            Type::U32 => Value::U32(0),
            Type::I32 => Value::I32(0),
            Type::U64 => Value::U64(0),
            Type::I64 => Value::I64(0),
            Type::F32 => Value::F32(0.0),
            Type::F64 => Value::F64(0.0),
            _ => Value::Null,
        }
    }

    /// Wrap a host function so lowered code can call it.
    pub fn native(
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, VmError> + 'static,
    ) -> Value {
        Value::Function(Function::Native(Rc::new(NativeFn::new(name, f))))
    }

    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::I8(_) => "i8",
            Value::U16(_) => "u16",
            Value::I16(_) => "i16",
            Value::U32(_) => "u32",
            Value::I32(_) => "i32",
            Value::U64(_) => "u64",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "str",
            Value::Array(_) => "array",
            Value::Function(_) => "fn",
            Value::Quoted(_) => "quote",
        }
    }

    /// Interpret as an array index or bound.
    pub fn as_index(&self) -> Result<i64, VmError> {
        match self {
            Value::I32(n) => Ok(i64::from(*n)),
            Value::I64(n) => Ok(*n),
            Value::U32(n) => Ok(i64::from(*n)),
            other => Err(VmError::TypeError(format!(
                "expected an integer index, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_array(&self) -> Result<&Rc<RefCell<MdArray>>, VmError> {
        match self {
            Value::Array(array) => Ok(array),
            other => Err(VmError::TypeError(format!(
                "expected an array, found {}",
                other.type_name()
            ))),
        }
    }
}

impl From<&Constant> for Value {
    fn from(c: &Constant) -> Self {
        match c {
            Constant::Null(_) => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::U8(n) => Value::U8(*n),
            Constant::I8(n) => Value::I8(*n),
            Constant::U16(n) => Value::U16(*n),
            Constant::I16(n) => Value::I16(*n),
            Constant::U32(n) => Value::U32(*n),
            Constant::I32(n) => Value::I32(*n),
            Constant::U64(n) => Value::U64(*n),
            Constant::I64(n) => Value::I64(*n),
            Constant::F32(n) => Value::F32(*n),
            Constant::F64(n) => Value::F64(*n),
            Constant::Str(s) => Value::str(s),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Quoted(a), Value::Quoted(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::U8(n) => write!(f, "{}", n),
            Value::I8(n) => write!(f, "{}", n),
            Value::U16(n) => write!(f, "{}", n),
            Value::I16(n) => write!(f, "{}", n),
            Value::U32(n) => write!(f, "{}", n),
            Value::I32(n) => write!(f, "{}", n),
            Value::U64(n) => write!(f, "{}", n),
            Value::I64(n) => write!(f, "{}", n),
            Value::F32(n) => write!(f, "{}", n),
            Value::F64(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(a) => write!(f, "{}", a.borrow()),
            Value::Function(func) => write!(f, "<fn {}>", func.name()),
            Value::Quoted(lambda) => write!(f, "<quote {}>", lambda.signature.name()),
        }
    }
}

/// Rectangular array stored row-major.
#[derive(Debug, Clone)]
pub struct MdArray {
    element: Type,
    bounds: Vec<usize>,
    data: Vec<Value>,
}

fn checked_len(bounds: &[usize]) -> Result<usize, VmError> {
    bounds
        .iter()
        .try_fold(1usize, |acc, &b| acc.checked_mul(b))
        .ok_or(VmError::ArraySizeOverflow)
}

impl MdArray {
    /// Array of default elements.
    pub fn new(element: Type, bounds: Vec<usize>) -> Result<Self, VmError> {
        let len = checked_len(&bounds)?;
        let data = vec![Value::default_for(&element); len];
        Ok(Self {
            element,
            bounds,
            data,
        })
    }

    /// Array holding `data` laid out row-major.
    pub fn from_row_major(
        element: Type,
        bounds: Vec<usize>,
        data: Vec<Value>,
    ) -> Result<Self, VmError> {
        let expected = checked_len(&bounds)?;
        if data.len() != expected {
            return Err(VmError::ElementCountMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            element,
            bounds,
            data,
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

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major offset of a multi-index, bounds-checked per dimension.
    pub fn offset(&self, indices: &[i64]) -> Result<usize, VmError> {
        if indices.len() != self.rank() {
            return Err(VmError::TypeError(format!(
                "array of rank {} indexed with {} indices",
                self.rank(),
                indices.len()
            )));
        }
        let mut offset = 0usize;
        for (dimension, (&index, &bound)) in indices.iter().zip(&self.bounds).enumerate() {
            let i = usize::try_from(index)
                .ok()
                .filter(|&i| i < bound)
                .ok_or(VmError::IndexOutOfRange {
                    dimension,
                    index,
                    bound,
                })?;
            offset = offset * bound + i;
        }
        Ok(offset)
    }

    pub fn get(&self, indices: &[i64]) -> Result<Value, VmError> {
        let offset = self.offset(indices)?;
        Ok(self.data[offset].clone())
    }

    pub fn set(&mut self, indices: &[i64], value: Value) -> Result<(), VmError> {
        let offset = self.offset(indices)?;
        self.set_at(offset, value);
        Ok(())
    }

    pub(crate) fn get_at(&self, offset: usize) -> Value {
        self.data[offset].clone()
    }

    pub(crate) fn set_at(&mut self, offset: usize, value: Value) {
        self.data[offset] = value;
    }

    /// Elements in row-major order.
    pub fn values(&self) -> &[Value] {
        &self.data
    }
}

impl fmt::Display for MdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?} [", self.element, self.bounds)?;
        for (i, v) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

#[derive(Clone)]
pub enum Function {
    Native(Rc<NativeFn>),
    Closure(Rc<Closure>),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Native(native) => &native.name,
            Function::Closure(closure) => closure.lambda.signature.name(),
        }
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Native(a), Function::Native(b)) => Rc::ptr_eq(a, b),
            (Function::Closure(a), Function::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native(native) => write!(f, "Native({})", native.name),
            Function::Closure(closure) => write!(f, "Closure({})", closure.lambda.signature),
        }
    }
}

type NativeBody = dyn Fn(&[Value]) -> Result<Value, VmError>;

pub struct NativeFn {
    pub name: String,
    f: Box<NativeBody>,
}

impl NativeFn {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, VmError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, VmError> {
        (self.f)(args)
    }
}

/// A lowered lambda together with the variables it closed over.
pub struct Closure {
    pub lambda: Arc<PrimLambda>,
    pub(crate) captured: Scope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_row_major_and_checked() {
        let array = MdArray::new(Type::I32, vec![2, 3]).unwrap();
        assert_eq!(array.offset(&[1, 2]).unwrap(), 5);
        assert_eq!(array.offset(&[0, 1]).unwrap(), 1);
        assert!(matches!(
            array.offset(&[2, 0]),
            Err(VmError::IndexOutOfRange { dimension: 0, index: 2, bound: 2 })
        ));
        assert!(matches!(
            array.offset(&[0, -1]),
            Err(VmError::IndexOutOfRange { dimension: 1, .. })
        ));
        assert!(matches!(array.offset(&[0]), Err(VmError::TypeError(_))));
    }

    #[test]
    fn new_arrays_hold_defaults() {
        let array = MdArray::new(Type::F64, vec![2, 2]).unwrap();
        assert_eq!(array.len(), 4);
        assert!(array.values().iter().all(|v| *v == Value::F64(0.0)));

        let strings = MdArray::new(Type::Str, vec![1]).unwrap();
        assert_eq!(strings.get(&[0]).unwrap(), Value::Null);
    }

    #[test]
    fn shape_errors_are_specific() {
        assert!(matches!(
            MdArray::new(Type::I32, vec![usize::MAX, 2]),
            Err(VmError::ArraySizeOverflow)
        ));
        let err = MdArray::from_row_major(Type::I32, vec![2, 2], vec![Value::I32(1)]).unwrap_err();
        assert!(matches!(
            err,
            VmError::ElementCountMismatch {
                expected: 4,
                found: 1
            }
        ));
    }

    #[test]
    fn arrays_compare_by_reference() {
        let a = Value::Array(Rc::new(RefCell::new(MdArray::new(Type::I32, vec![1]).unwrap())));
        let b = Value::Array(Rc::new(RefCell::new(MdArray::new(Type::I32, vec![1]).unwrap())));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn constants_convert_to_matching_values() {
        assert_eq!(Value::from(&Constant::U16(7)), Value::U16(7));
        assert_eq!(Value::from(&Constant::Str("hi".into())), Value::str("hi"));
        assert_eq!(Value::from(&Constant::Null(Type::Str)), Value::Null);
        assert_ne!(Value::I32(1), Value::I64(1));
    }
}
