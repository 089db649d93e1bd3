//! Primitive IR: the closed set of operations extended nodes lower into.
//!
//! Evaluation order is the order of the tree: children of a node are
//! evaluated left to right, block bodies top to bottom.

use crate::signature::{MethodRef, Signature};
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Typed literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Null(Type),
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
    Str(String),
}

impl Constant {
    pub fn ty(&self) -> Type {
        match self {
            Constant::Null(ty) => ty.clone(),
            Constant::Bool(_) => Type::Bool,
            Constant::U8(_) => Type::U8,
            Constant::I8(_) => Type::I8,
            Constant::U16(_) => Type::U16,
            Constant::I16(_) => Type::I16,
            Constant::U32(_) => Type::U32,
            Constant::I32(_) => Type::I32,
            Constant::U64(_) => Type::U64,
            Constant::I64(_) => Type::I64,
            Constant::F32(_) => Type::F32,
            Constant::F64(_) => Type::F64,
            Constant::Str(_) => Type::Str,
        }
    }

    /// The literal `1` of the given numeric type (nullable types use their
    /// underlying type). `None` for non-numeric types.
    pub fn one(ty: &Type) -> Option<Constant> {
        let one = match ty.non_nullable() {
            Type::U8 => Constant::U8(1),
            Type::I8 => Constant::I8(1),
            Type::U16 => Constant::U16(1),
            Type::I16 => Constant::I16(1),
            Type::U32 => Constant::U32(1),
            Type::I32 => Constant::I32(1),
            Type::U64 => Constant::U64(1),
            Type::I64 => Constant::I64(1),
            Type::F32 => Constant::F32(1.0),
            Type::F64 => Constant::F64(1.0),
            _ => return None,
        };
        Some(one)
    }

    /// Equality that treats floats bitwise, so `NaN` is identical to itself.
    pub fn identical(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::F32(a), Constant::F32(b)) => a.to_bits() == b.to_bits(),
            (Constant::F64(a), Constant::F64(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null(_) => write!(f, "null"),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::U8(n) => write!(f, "{}u8", n),
            Constant::I8(n) => write!(f, "{}i8", n),
            Constant::U16(n) => write!(f, "{}u16", n),
            Constant::I16(n) => write!(f, "{}i16", n),
            Constant::U32(n) => write!(f, "{}u32", n),
            Constant::I32(n) => write!(f, "{}", n),
            Constant::U64(n) => write!(f, "{}u64", n),
            Constant::I64(n) => write!(f, "{}i64", n),
            Constant::F32(n) => write!(f, "{}f32", n),
            Constant::F64(n) => write!(f, "{}f64", n),
            Constant::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(u64);

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(1);

impl VarId {
    fn fresh() -> Self {
        VarId(NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A variable: parameter, block local, or lowering temporary.
/// Two `Var`s are the same variable iff their ids match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Var {
    pub id: VarId,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

impl Var {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            id: VarId::fresh(),
            name: name.into(),
            ty,
        }
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

/// Increment/decrement store forms understood natively by the primitive IR.
/// These never check for overflow.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum IncDecOp {
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl IncDecOp {
    pub fn is_prefix(self) -> bool {
        matches!(self, IncDecOp::PreIncrement | IncDecOp::PreDecrement)
    }

    pub fn arith(self) -> ArithOp {
        match self {
            IncDecOp::PreIncrement | IncDecOp::PostIncrement => ArithOp::Add,
            IncDecOp::PreDecrement | IncDecOp::PostDecrement => ArithOp::Sub,
        }
    }
}

/// A storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Place {
    Var(Var),
    /// Array element; `array` and `indices` are evaluated before the store.
    Element { array: Box<Prim>, indices: Vec<Prim> },
}

impl Place {
    pub fn read(&self) -> Prim {
        match self {
            Place::Var(var) => Prim::Read(var.clone()),
            Place::Element { array, indices } => Prim::Element {
                array: array.clone(),
                indices: indices.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimLambda {
    pub signature: Arc<Signature>,
    pub params: Vec<Var>,
    pub body: Prim,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Prim {
    Const(Constant),
    Read(Var),
    /// Store `value` into `target`; yields the stored value.
    Assign { target: Place, value: Box<Prim> },
    /// Scoped locals (default-initialized); yields the last body value.
    Block { locals: Vec<Var>, body: Vec<Prim> },
    Arith {
        op: ArithOp,
        checked: bool,
        left: Box<Prim>,
        right: Box<Prim>,
    },
    /// Wrapping increment/decrement of a location, evaluating it once.
    UnaryAssign { op: IncDecOp, target: Place },
    /// Allocate an array of default elements with the given bounds.
    NewArrayBounds { element: Type, bounds: Vec<Prim> },
    /// Materialize a whole array from constants laid out row-major.
    ConstArray {
        element: Type,
        bounds: Vec<usize>,
        values: Vec<Constant>,
    },
    Element { array: Box<Prim>, indices: Vec<Prim> },
    Call { callee: Box<Prim>, args: Vec<Prim> },
    CallMethod { method: MethodRef, args: Vec<Prim> },
    Lambda(Arc<PrimLambda>),
    Quote(Arc<PrimLambda>),
}

impl Prim {
    pub fn constant(value: Constant) -> Self {
        Prim::Const(value)
    }

    pub fn assign(target: Place, value: Prim) -> Self {
        Prim::Assign {
            target,
            value: Box::new(value),
        }
    }

    /// Constants and variable reads: evaluating them has no side effect.
    pub fn is_trivial(&self) -> bool {
        matches!(self, Prim::Const(_) | Prim::Read(_))
    }

    /// Pre-order walk over this tree, including lambda bodies.
    pub fn for_each(&self, f: &mut dyn FnMut(&Prim)) {
        f(self);
        match self {
            Prim::Const(_) | Prim::Read(_) | Prim::ConstArray { .. } => {}
            Prim::Assign { target, value } => {
                target.for_each(f);
                value.for_each(f);
            }
            Prim::Block { body, .. } => body.iter().for_each(|p| p.for_each(f)),
            Prim::Arith { left, right, .. } => {
                left.for_each(f);
                right.for_each(f);
            }
            Prim::UnaryAssign { target, .. } => target.for_each(f),
            Prim::NewArrayBounds { bounds, .. } => bounds.iter().for_each(|p| p.for_each(f)),
            Prim::Element { array, indices } => {
                array.for_each(f);
                indices.iter().for_each(|p| p.for_each(f));
            }
            Prim::Call { callee, args } => {
                callee.for_each(f);
                args.iter().for_each(|p| p.for_each(f));
            }
            Prim::CallMethod { args, .. } => args.iter().for_each(|p| p.for_each(f)),
            Prim::Lambda(lambda) | Prim::Quote(lambda) => lambda.body.for_each(f),
        }
    }
}

impl Place {
    fn for_each(&self, f: &mut dyn FnMut(&Prim)) {
        if let Place::Element { array, indices } = self {
            array.for_each(f);
            indices.iter().for_each(|p| p.for_each(f));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_matches_operand_type() {
        assert_eq!(Constant::one(&Type::U8), Some(Constant::U8(1)));
        assert_eq!(Constant::one(&Type::I16), Some(Constant::I16(1)));
        assert_eq!(Constant::one(&Type::nullable(Type::U64)), Some(Constant::U64(1)));
        assert_eq!(Constant::one(&Type::F32), Some(Constant::F32(1.0)));
        assert_eq!(Constant::one(&Type::Str), None);
        for ty in [
            Type::U8,
            Type::I8,
            Type::U16,
            Type::I16,
            Type::U32,
            Type::I32,
            Type::U64,
            Type::I64,
            Type::F32,
            Type::F64,
        ] {
            assert_eq!(Constant::one(&ty).map(|c| c.ty()), Some(ty));
        }
    }

    #[test]
    fn nan_constants_are_identical() {
        assert!(Constant::F64(f64::NAN).identical(&Constant::F64(f64::NAN)));
        assert!(!Constant::F64(0.0).identical(&Constant::F32(0.0)));
    }

    #[test]
    fn vars_compare_by_id() {
        let a = Var::new("x", Type::I32);
        let b = Var::new("x", Type::I32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn lowered_trees_serialize() {
        let x = Var::new("x", Type::I32);
        let prim = Prim::assign(
            Place::Var(x.clone()),
            Prim::Arith {
                op: ArithOp::Add,
                checked: true,
                left: Box::new(Prim::Read(x)),
                right: Box::new(Prim::constant(Constant::I32(1))),
            },
        );
        let json = serde_json::to_string(&prim).expect("serialize");
        assert!(json.contains("Arith"));
        let back: Prim = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(back, Prim::Assign { .. }));
    }
}
