//! Invocation with named parameter bindings: side effects follow binding
//! order, arguments land in declaration order.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use xtree_compiler::{lower, Expr, InvocationBuilder, NodeError, ParameterBinding, UnaryAssignKind};
use xtree_core::{ArithOp, Constant, Signature, Type, Var};
use xtree_vm::{Value, Vm, VmError};

type Log = Rc<RefCell<Vec<String>>>;

fn add_sig() -> Arc<Signature> {
    Signature::builder("add")
        .param("arg1", Type::I32)
        .param("arg2", Type::I32)
        .returns(Type::I32)
}

fn bind(sig: &Signature, name: &str, value: Expr) -> ParameterBinding {
    let param = sig.param(name).expect("declared parameter").clone();
    ParameterBinding::new(param, value).expect("well-typed binding")
}

fn int_args(args: &[Value]) -> Result<Vec<i32>, VmError> {
    args.iter()
        .map(|a| match a {
            Value::I32(n) => Ok(*n),
            other => Err(VmError::TypeError(format!("expected i32, got {}", other.type_name()))),
        })
        .collect()
}

/// `arg1 * 10 + arg2`, so swapped arguments are visible in the result.
fn positional() -> Value {
    Value::native("add", |args| {
        let args = int_args(args)?;
        Ok(Value::I32(args[0] * 10 + args[1]))
    })
}

/// Host environment: `pick()` logs "F" and returns `add`; `log(n)` logs `n`
/// and returns it.
struct Env {
    vm: Vm,
    log: Log,
    pick: Var,
    trace: Var,
}

impl Env {
    fn new(sig: &Arc<Signature>) -> Self {
        let log: Log = Rc::default();
        let pick = Var::new(
            "pick",
            Type::Fn(Signature::builder("pick").returns(Type::Fn(sig.clone()))),
        );
        let trace = Var::new(
            "log",
            Type::Fn(Signature::builder("log").param("value", Type::I32).returns(Type::I32)),
        );

        let mut vm = Vm::new();
        let sink = log.clone();
        let target = positional();
        vm.bind(
            &pick,
            Value::native("pick", move |_| {
                sink.borrow_mut().push("F".into());
                Ok(target.clone())
            }),
        );
        let sink = log.clone();
        vm.bind(
            &trace,
            Value::native("log", move |args| {
                let n = int_args(args)?[0];
                sink.borrow_mut().push(n.to_string());
                Ok(Value::I32(n))
            }),
        );
        Self {
            vm,
            log,
            pick,
            trace,
        }
    }

    fn callee(&self) -> Expr {
        Expr::call(Expr::variable(&self.pick), vec![]).unwrap()
    }

    fn logged(&self, n: i32) -> Expr {
        Expr::call(Expr::variable(&self.trace), vec![Expr::constant(Constant::I32(n))]).unwrap()
    }

    fn run(&mut self, expr: &Expr) -> Value {
        self.log.borrow_mut().clear();
        let prim = lower(expr).expect("lowering should succeed");
        self.vm.eval(&prim).expect("evaluation should succeed")
    }

    fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

#[test]
fn side_effects_follow_binding_order() {
    let sig = add_sig();
    let mut env = Env::new(&sig);

    let in_order = Expr::invoke(
        env.callee(),
        vec![
            bind(&sig, "arg1", env.logged(1)),
            bind(&sig, "arg2", env.logged(2)),
        ],
    )
    .unwrap();
    assert_eq!(env.run(&in_order), Value::I32(12));
    assert_eq!(env.entries(), ["F", "1", "2"]);

    let reversed = Expr::invoke(
        env.callee(),
        vec![
            bind(&sig, "arg2", env.logged(2)),
            bind(&sig, "arg1", env.logged(1)),
        ],
    )
    .unwrap();
    assert_eq!(env.run(&reversed), Value::I32(12));
    assert_eq!(env.entries(), ["F", "2", "1"]);
}

#[test]
fn omitted_optional_parameter_gets_its_default() {
    let sig = Signature::builder("d")
        .param("arg1", Type::I32)
        .optional("arg2", Type::I32, Constant::I32(42))
        .returns(Type::I32);
    let d = Var::new("d", Type::Fn(sig.clone()));
    let mut vm = Vm::new();
    vm.bind(
        &d,
        Value::native("d", |args| {
            let args = int_args(args)?;
            Ok(Value::I32(args[0] + args[1]))
        }),
    );

    let expr = Expr::invoke(
        Expr::variable(&d),
        vec![bind(&sig, "arg1", Expr::constant(Constant::I32(1)))],
    )
    .unwrap();
    assert_eq!(vm.eval(&lower(&expr).unwrap()).unwrap(), Value::I32(43));

    let explicit = Expr::invoke(
        Expr::variable(&d),
        vec![
            bind(&sig, "arg2", Expr::constant(Constant::I32(2))),
            bind(&sig, "arg1", Expr::constant(Constant::I32(1))),
        ],
    )
    .unwrap();
    assert_eq!(vm.eval(&lower(&explicit).unwrap()).unwrap(), Value::I32(3));
}

#[test]
fn later_binding_sees_earlier_side_effects() {
    // f(arg2: x++, arg1: x) with x = 5 passes arg1 = 6, arg2 = 5.
    let sig = add_sig();
    let f = Var::new("f", Type::Fn(sig.clone()));
    let x = Var::new("x", Type::I32);
    let bump =
        Expr::unary_assign(UnaryAssignKind::PostIncrement, Expr::variable(&x), None).unwrap();

    let expr = Expr::invoke(
        Expr::variable(&f),
        vec![
            bind(&sig, "arg2", bump),
            bind(&sig, "arg1", Expr::variable(&x)),
        ],
    )
    .unwrap();

    let mut vm = Vm::new();
    vm.bind(&f, positional());
    vm.bind(&x, Value::I32(5));
    assert_eq!(vm.eval(&lower(&expr).unwrap()).unwrap(), Value::I32(65));
    assert_eq!(vm.get(&x), Some(Value::I32(6)));
}

#[test]
fn lambda_callee_receives_declaration_order() {
    // (a, b) => a - b, called as (b: 1, a: 10)
    let sig = Signature::builder("sub")
        .param("a", Type::I32)
        .param("b", Type::I32)
        .returns(Type::I32);
    let a = Var::new("a", Type::I32);
    let b = Var::new("b", Type::I32);
    let body = Expr::binary(ArithOp::Sub, true, Expr::variable(&a), Expr::variable(&b)).unwrap();
    let lambda = Expr::lambda(sig.clone(), vec![a, b], body).unwrap();

    let expr = InvocationBuilder::new()
        .callee(lambda)
        .binding(bind(&sig, "b", Expr::constant(Constant::I32(1))))
        .binding(bind(&sig, "a", Expr::constant(Constant::I32(10))))
        .build()
        .unwrap();
    assert_eq!(Vm::new().eval(&lower(&expr).unwrap()).unwrap(), Value::I32(9));
}

#[test]
fn invalid_bindings_fail_at_construction() {
    let sig = add_sig();
    let f = Var::new("f", Type::Fn(sig.clone()));
    let one = || Expr::constant(Constant::I32(1));

    let err = Expr::invoke(
        Expr::variable(&f),
        vec![bind(&sig, "arg1", one()), bind(&sig, "arg1", one())],
    )
    .unwrap_err();
    assert_eq!(
        err,
        NodeError::DuplicateParameterBinding {
            parameter: "arg1".into()
        }
    );

    let err = Expr::invoke(Expr::variable(&f), vec![bind(&sig, "arg2", one())]).unwrap_err();
    assert_eq!(
        err,
        NodeError::UnboundRequiredParameter {
            parameter: "arg1".into()
        }
    );

    // a structurally identical signature is still a different callee
    let twin = add_sig();
    let err = Expr::invoke(
        Expr::variable(&f),
        vec![bind(&twin, "arg1", one()), bind(&twin, "arg2", one())],
    )
    .unwrap_err();
    assert!(matches!(err, NodeError::WrongCalleeMember { .. }));
}
