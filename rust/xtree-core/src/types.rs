//! Static types carried by expression nodes and primitive IR.

use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A static type.
///
/// `Fn` types are nominal: two function types are equal only when they refer
/// to the same [`Signature`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Str,
    Object,
    /// Array with `rank` dimensions.
    Array { element: Box<Type>, rank: usize },
    /// Callable value with the given signature.
    Fn(Arc<Signature>),
    /// Quoted code: a lambda kept as data. The inner type is the lambda's `Fn` type.
    Quoted(Box<Type>),
    /// Value type that may also be null.
    Nullable(Box<Type>),
}

impl Type {
    pub fn array(element: Type, rank: usize) -> Self {
        Type::Array {
            element: Box::new(element),
            rank,
        }
    }

    pub fn nullable(inner: Type) -> Self {
        Type::Nullable(Box::new(inner))
    }

    pub fn quoted(inner: Type) -> Self {
        Type::Quoted(Box::new(inner))
    }

    /// Strip one level of `Nullable`.
    pub fn non_nullable(&self) -> &Type {
        match self {
            Type::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::U8
                | Type::I8
                | Type::U16
                | Type::I16
                | Type::U32
                | Type::I32
                | Type::U64
                | Type::I64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    /// Numeric types, not counting nullable wrappers.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Numeric or nullable numeric.
    pub fn is_arithmetic(&self) -> bool {
        self.non_nullable().is_numeric()
    }

    /// Reference types can be stored in an `Object` slot without conversion.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Str | Type::Object | Type::Array { .. } | Type::Fn(_) | Type::Quoted(_)
        )
    }

    /// Reference assignability: identical types, or an `Object` destination
    /// receiving a reference-typed source. Value types never box implicitly.
    pub fn is_assignable_from(&self, source: &Type) -> bool {
        if self == source {
            return true;
        }
        matches!(self, Type::Object) && source.is_reference()
    }

    /// The signature of a callable type.
    pub fn signature(&self) -> Option<&Arc<Signature>> {
        match self {
            Type::Fn(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<(&Type, usize)> {
        match self {
            Type::Array { element, rank } => Some((element, *rank)),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::U8 => write!(f, "u8"),
            Type::I8 => write!(f, "i8"),
            Type::U16 => write!(f, "u16"),
            Type::I16 => write!(f, "i16"),
            Type::U32 => write!(f, "u32"),
            Type::I32 => write!(f, "i32"),
            Type::U64 => write!(f, "u64"),
            Type::I64 => write!(f, "i64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::Str => write!(f, "str"),
            Type::Object => write!(f, "object"),
            Type::Array { element, rank } => {
                write!(f, "{}[{}]", element, ",".repeat(rank.saturating_sub(1)))
            }
            Type::Fn(sig) => write!(f, "{}", sig),
            Type::Quoted(inner) => write!(f, "quote<{}>", inner),
            Type::Nullable(inner) => write!(f, "{}?", inner),
        }
    }
}
