//! Tree-walking evaluator for the primitive IR.

mod ops;

use crate::values::{Closure, Function, MdArray, NativeFn, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;
use xtree_core::{IncDecOp, Place, Prim, Var, VarId};

#[derive(Debug, Error)]
pub enum VmError {
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("unbound variable: {0}")]
    UnboundVariable(String),
    #[error("undefined method: {0}")]
    UndefinedMethod(String),
    #[error("index {index} out of range for dimension {dimension} (bound {bound})")]
    IndexOutOfRange {
        dimension: usize,
        index: i64,
        bound: usize,
    },
    #[error("negative array bound: {0}")]
    NegativeBound(i64),
    #[error("value of type {0} is not callable")]
    NotCallable(&'static str),
    #[error("argument count mismatch: expected {expected}, found {found}")]
    ArgumentCount { expected: usize, found: usize },
    #[error("type error at runtime: {0}")]
    TypeError(String),
    #[error("native function `{name}` failed: {message}")]
    Native { name: String, message: String },
    #[error("stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),
    #[error("array size overflows")]
    ArraySizeOverflow,
    #[error("array of {found} elements cannot fill bounds holding {expected}")]
    ElementCountMismatch { expected: usize, found: usize },
}

impl VmError {
    pub fn is_arithmetic_overflow(&self) -> bool {
        matches!(self, VmError::ArithmeticOverflow)
    }
}

#[derive(Debug, Clone)]
pub struct VmOptions {
    /// Deepest nesting of closure calls before [`VmError::StackOverflow`].
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 256,
        }
    }
}

type Cell = Rc<RefCell<Value>>;
pub(crate) type Scope = HashMap<VarId, Cell>;

/// A resolved storage location.
enum Slot {
    Var(Cell),
    Element(Rc<RefCell<MdArray>>, usize),
}

impl Slot {
    fn load(&self) -> Value {
        match self {
            Slot::Var(cell) => cell.borrow().clone(),
            Slot::Element(array, offset) => array.borrow().get_at(*offset),
        }
    }

    fn store(&self, value: Value) {
        match self {
            Slot::Var(cell) => *cell.borrow_mut() = value,
            Slot::Element(array, offset) => array.borrow_mut().set_at(*offset, value),
        }
    }
}

pub struct Vm {
    options: VmOptions,
    globals: Scope,
    scopes: Vec<Scope>,
    methods: HashMap<String, Function>,
    depth: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> Self {
        Self {
            options,
            globals: HashMap::new(),
            scopes: Vec::new(),
            methods: HashMap::new(),
            depth: 0,
        }
    }

    /// Bind a free variable of the program being evaluated.
    pub fn bind(&mut self, var: &Var, value: Value) {
        self.globals.insert(var.id, Rc::new(RefCell::new(value)));
    }

    /// Current value of a bound variable.
    pub fn get(&self, var: &Var) -> Option<Value> {
        self.lookup(var).map(|cell| cell.borrow().clone())
    }

    /// Make `f` callable through `CallMethod` under `name`.
    pub fn register_method(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, VmError> + 'static,
    ) {
        let name = name.into();
        let function = Function::Native(Rc::new(NativeFn::new(name.clone(), f)));
        self.methods.insert(name, function);
    }

    fn lookup(&self, var: &Var) -> Option<&Cell> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&var.id))
            .or_else(|| self.globals.get(&var.id))
    }

    pub fn eval(&mut self, prim: &Prim) -> Result<Value, VmError> {
        match prim {
            Prim::Const(c) => Ok(Value::from(c)),
            Prim::Read(var) => self
                .get(var)
                .ok_or_else(|| VmError::UnboundVariable(var.to_string())),
            Prim::Assign { target, value } => {
                let slot = self.resolve(target)?;
                let value = self.eval(value)?;
                slot.store(value.clone());
                Ok(value)
            }
            Prim::Block { locals, body } => {
                let scope = locals
                    .iter()
                    .map(|var| (var.id, Rc::new(RefCell::new(Value::default_for(&var.ty)))))
                    .collect();
                self.scopes.push(scope);
                let result = self.eval_seq(body);
                self.scopes.pop();
                result
            }
            Prim::Arith {
                op,
                checked,
                left,
                right,
            } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                ops::binary(*op, *checked, &lhs, &rhs)
            }
            Prim::UnaryAssign { op, target } => self.unary_assign(*op, target),
            Prim::NewArrayBounds { element, bounds } => {
                let bounds = bounds
                    .iter()
                    .map(|b| {
                        let n = self.eval(b)?.as_index()?;
                        usize::try_from(n).map_err(|_| VmError::NegativeBound(n))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let array = MdArray::new(element.clone(), bounds)?;
                Ok(Value::Array(Rc::new(RefCell::new(array))))
            }
            Prim::ConstArray {
                element,
                bounds,
                values,
            } => {
                let data = values.iter().map(Value::from).collect();
                let array = MdArray::from_row_major(element.clone(), bounds.clone(), data)?;
                Ok(Value::Array(Rc::new(RefCell::new(array))))
            }
            Prim::Element { array, indices } => {
                let array = self.eval(array)?;
                let indices = self.eval_indices(indices)?;
                let value = array.as_array()?.borrow().get(&indices)?;
                Ok(value)
            }
            Prim::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let args = self.eval_all(args)?;
                self.call(&callee, args)
            }
            Prim::CallMethod { method, args } => {
                let function = self
                    .methods
                    .get(&method.name)
                    .cloned()
                    .ok_or_else(|| VmError::UndefinedMethod(method.name.clone()))?;
                let args = self.eval_all(args)?;
                self.call(&Value::Function(function), args)
            }
            Prim::Lambda(lambda) => Ok(Value::Function(Function::Closure(Rc::new(Closure {
                lambda: lambda.clone(),
                captured: self.capture(),
            })))),
            Prim::Quote(lambda) => Ok(Value::Quoted(lambda.clone())),
        }
    }

    /// Call a function value with already-evaluated arguments.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, VmError> {
        let function = match callee {
            Value::Function(function) => function,
            other => return Err(VmError::NotCallable(other.type_name())),
        };
        trace!(function = function.name(), args = args.len(), "call");
        match function {
            Function::Native(native) => native.call(&args),
            Function::Closure(closure) => {
                let params = &closure.lambda.params;
                if params.len() != args.len() {
                    return Err(VmError::ArgumentCount {
                        expected: params.len(),
                        found: args.len(),
                    });
                }
                if self.depth >= self.options.max_call_depth {
                    return Err(VmError::StackOverflow(self.options.max_call_depth));
                }
                let frame: Scope = params
                    .iter()
                    .zip(args)
                    .map(|(param, arg)| (param.id, Rc::new(RefCell::new(arg))))
                    .collect();
                let saved =
                    std::mem::replace(&mut self.scopes, vec![closure.captured.clone(), frame]);
                self.depth += 1;
                let result = self.eval(&closure.lambda.body);
                self.depth -= 1;
                self.scopes = saved;
                result
            }
        }
    }

    fn eval_seq(&mut self, body: &[Prim]) -> Result<Value, VmError> {
        let mut last = Value::Null;
        for prim in body {
            last = self.eval(prim)?;
        }
        Ok(last)
    }

    fn eval_all(&mut self, prims: &[Prim]) -> Result<Vec<Value>, VmError> {
        prims.iter().map(|p| self.eval(p)).collect()
    }

    fn eval_indices(&mut self, indices: &[Prim]) -> Result<Vec<i64>, VmError> {
        indices
            .iter()
            .map(|p| self.eval(p)?.as_index())
            .collect()
    }

    /// Evaluate a place's array and indices, in that order.
    fn resolve(&mut self, place: &Place) -> Result<Slot, VmError> {
        match place {
            Place::Var(var) => self
                .lookup(var)
                .cloned()
                .map(Slot::Var)
                .ok_or_else(|| VmError::UnboundVariable(var.to_string())),
            Place::Element { array, indices } => {
                let array = self.eval(array)?;
                let indices = self.eval_indices(indices)?;
                let array = array.as_array()?.clone();
                let offset = array.borrow().offset(&indices)?;
                Ok(Slot::Element(array, offset))
            }
        }
    }

    fn unary_assign(&mut self, op: IncDecOp, target: &Place) -> Result<Value, VmError> {
        let slot = self.resolve(target)?;
        let old = slot.load();
        let one = ops::one_like(&old)?;
        let new = ops::binary(op.arith(), false, &old, &one)?;
        slot.store(new.clone());
        Ok(if op.is_prefix() { new } else { old })
    }

    /// Snapshot of every visible local; cells are shared, not copied.
    fn capture(&self) -> Scope {
        let mut captured = Scope::new();
        for scope in &self.scopes {
            for (id, cell) in scope {
                captured.insert(*id, cell.clone());
            }
        }
        captured
    }
}
