//! Callable signatures and parameter descriptors.
//!
//! A [`Signature`] is nominal: it gets a fresh id when built, and parameters
//! remember the id of the signature that owns them. Membership checks at call
//! sites compare those ids rather than names or positions.

use crate::lir::Constant;
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureId(Uuid);

impl SignatureId {
    fn fresh() -> Self {
        SignatureId(Uuid::new_v4())
    }
}

impl fmt::Display for SignatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One formal parameter of a callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    signature: SignatureId,
    position: usize,
    name: String,
    #[serde(rename = "type")]
    ty: Type,
    default: Option<Constant>,
}

impl Parameter {
    pub fn signature_id(&self) -> SignatureId {
        self.signature
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Value used when a call site omits this parameter.
    pub fn default(&self) -> Option<&Constant> {
        self.default.as_ref()
    }

    /// Descriptor identity: same owning signature and same position.
    pub fn same(&self, other: &Parameter) -> bool {
        self.signature == other.signature && self.position == other.position
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Shape of a callable: ordered parameters and a return type.
#[derive(Debug, Serialize, Deserialize)]
pub struct Signature {
    id: SignatureId,
    name: String,
    params: Vec<Arc<Parameter>>,
    ret: Type,
}

impl Signature {
    pub fn builder(name: impl Into<String>) -> SignatureBuilder {
        SignatureBuilder {
            id: SignatureId::fresh(),
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn id(&self) -> SignatureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Arc<Parameter>] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Arc<Parameter>> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn return_type(&self) -> &Type {
        &self.ret
    }

    pub fn owns(&self, param: &Parameter) -> bool {
        param.signature == self.id
    }

    /// The declared descriptor, if `param` is exactly it. A descriptor that
    /// only shares the id and position (one deserialized with another type,
    /// say) is not a member.
    pub fn declared(&self, param: &Arc<Parameter>) -> Option<&Arc<Parameter>> {
        self.params
            .get(param.position)
            .filter(|declared| Arc::ptr_eq(declared, param) || ***declared == **param)
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|p| p.ty.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({}) -> {}", self.name, params, self.ret)
    }
}

pub struct SignatureBuilder {
    id: SignatureId,
    name: String,
    params: Vec<Arc<Parameter>>,
}

impl SignatureBuilder {
    pub fn param(self, name: impl Into<String>, ty: Type) -> Self {
        self.push(name.into(), ty, None)
    }

    pub fn optional(self, name: impl Into<String>, ty: Type, default: Constant) -> Self {
        self.push(name.into(), ty, Some(default))
    }

    fn push(mut self, name: String, ty: Type, default: Option<Constant>) -> Self {
        let position = self.params.len();
        self.params.push(Arc::new(Parameter {
            signature: self.id,
            position,
            name,
            ty,
            default,
        }));
        self
    }

    pub fn returns(self, ret: Type) -> Arc<Signature> {
        Arc::new(Signature {
            id: self.id,
            name: self.name,
            params: self.params,
            ret,
        })
    }
}

/// Handle to a user-defined operator: one operand in, one result out.
///
/// The implementation lives outside the IR; evaluators resolve it by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRef {
    pub name: String,
    pub signature: Arc<Signature>,
}

impl MethodRef {
    pub fn new(name: impl Into<String>, signature: Arc<Signature>) -> Self {
        Self {
            name: name.into(),
            signature,
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_belong_to_their_signature() {
        let a = Signature::builder("a")
            .param("x", Type::I32)
            .returns(Type::I32);
        let b = Signature::builder("b")
            .param("x", Type::I32)
            .returns(Type::I32);

        assert!(a.owns(&a.params()[0]));
        assert!(!b.owns(&a.params()[0]));
        assert!(!a.params()[0].same(&b.params()[0]));
        assert_ne!(*a, *b);
    }

    #[test]
    fn only_the_declared_descriptor_is_a_member() {
        let sig = Signature::builder("add")
            .param("arg1", Type::I32)
            .returns(Type::I32);
        let arg1 = &sig.params()[0];
        assert!(sig.declared(arg1).is_some());

        let copy = Arc::new((**arg1).clone());
        assert!(sig.declared(&copy).is_some());

        let mut retyped = (**arg1).clone();
        retyped.ty = Type::Str;
        let retyped = Arc::new(retyped);
        assert!(sig.owns(&retyped));
        assert!(retyped.same(arg1));
        assert!(sig.declared(&retyped).is_none());

        let mut shifted = (**arg1).clone();
        shifted.position = 3;
        assert!(sig.declared(&Arc::new(shifted)).is_none());
    }

    #[test]
    fn optional_parameters_carry_defaults() {
        let sig = Signature::builder("f")
            .param("x", Type::I32)
            .optional("y", Type::I32, Constant::I32(42))
            .returns(Type::I32);

        let y = sig.param("y").expect("y");
        assert_eq!(y.position(), 1);
        assert!(y.is_optional());
        assert_eq!(y.default(), Some(&Constant::I32(42)));
        assert_eq!(sig.to_string(), "f(i32, i32) -> i32");
    }

    #[test]
    fn fn_types_are_nominal() {
        let a = Signature::builder("d").returns(Type::Void);
        let b = Signature::builder("d").returns(Type::Void);
        assert_eq!(Type::Fn(a.clone()), Type::Fn(a.clone()));
        assert_ne!(Type::Fn(a), Type::Fn(b));
    }
}
