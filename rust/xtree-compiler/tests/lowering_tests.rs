//! Lowering entry points: visitor pre-passes, TOML options, depth limits.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use xtree_compiler::visitor::walk_unary_assign;
use xtree_compiler::{
    lower_configured, lower_with, Error, Expr, LowerError, LowerOptions, NodeResult, UnaryAssign,
    UnaryAssignKind, Visitor,
};
use xtree_core::{ArithOp, Constant, Prim, Type, Var};
use xtree_vm::{Value, Vm};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Turns every checked increment/decrement into its unchecked form.
struct Uncheck {
    rewritten: usize,
}

impl Visitor for Uncheck {
    fn visit_unary_assign(&mut self, node: &Arc<UnaryAssign>) -> NodeResult<Expr> {
        let kind = match node.kind() {
            UnaryAssignKind::PreIncrementChecked => UnaryAssignKind::PreIncrement,
            UnaryAssignKind::PreDecrementChecked => UnaryAssignKind::PreDecrement,
            UnaryAssignKind::PostIncrementChecked => UnaryAssignKind::PostIncrement,
            UnaryAssignKind::PostDecrementChecked => UnaryAssignKind::PostDecrement,
            _ => return walk_unary_assign(self, node),
        };
        self.rewritten += 1;
        let operand = self.visit(node.operand())?;
        Expr::unary_assign(kind, operand, node.method().cloned())
    }
}

fn deep_sum(depth: usize) -> (Var, Expr) {
    let x = Var::new("x", Type::I64);
    let expr = (0..depth).fold(Expr::variable(&x), |acc, _| {
        Expr::binary(ArithOp::Add, true, acc, Expr::constant(Constant::I64(1))).unwrap()
    });
    (x, expr)
}

#[test]
fn visitor_rewrite_runs_before_lowering() {
    init_tracing();
    let x = Var::new("x", Type::I32);
    let expr = Expr::unary_assign(UnaryAssignKind::PreIncrementChecked, Expr::variable(&x), None)
        .unwrap();

    let mut uncheck = Uncheck { rewritten: 0 };
    let prim = lower_with(&mut uncheck, &expr, LowerOptions::default()).unwrap();
    assert_eq!(uncheck.rewritten, 1);
    assert!(matches!(prim, Prim::UnaryAssign { .. }));

    let mut vm = Vm::new();
    vm.bind(&x, Value::I32(i32::MAX));
    assert_eq!(vm.eval(&prim).unwrap(), Value::I32(i32::MIN));
}

#[test]
fn untouched_tree_lowers_like_plain_lower() {
    let (x, expr) = deep_sum(3);
    let mut noop = Uncheck { rewritten: 0 };
    let prim = lower_with(&mut noop, &expr, LowerOptions::default()).unwrap();
    assert_eq!(noop.rewritten, 0);

    let mut vm = Vm::new();
    vm.bind(&x, Value::I64(4));
    assert_eq!(vm.eval(&prim).unwrap(), Value::I64(7));
}

#[test]
fn depth_limit_surfaces_through_every_entry_point() {
    init_tracing();
    let (_, expr) = deep_sum(64);

    let err = lower_configured(&expr, "max_depth = 32").unwrap_err();
    assert!(matches!(err, Error::Lower(LowerError::DepthLimitExceeded(32))));

    let options = LowerOptions {
        max_depth: 32,
        ..LowerOptions::default()
    };
    let err = lower_with(&mut Uncheck { rewritten: 0 }, &expr, options).unwrap_err();
    assert!(matches!(err, Error::Lower(LowerError::DepthLimitExceeded(32))));

    assert!(lower_configured(&expr, "max_depth = 128").is_ok());
}

#[test]
fn options_load_from_toml() {
    let elements = (0..4).map(|i| Expr::constant(Constant::I32(i))).collect();
    let array = Expr::new_array_init(Type::I32, [2, 2], elements).unwrap();

    let folded = lower_configured(&array, "fold_constant_arrays = true").unwrap();
    assert!(matches!(folded, Prim::ConstArray { .. }));
    let unfolded = lower_configured(&array, "").unwrap();
    assert!(matches!(unfolded, Prim::Block { .. }));

    let err = lower_configured(&array, "fold_constant_arrays = 3").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn lowered_trees_are_shareable_across_threads() {
    let (x, expr) = deep_sum(10);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let expr = expr.clone();
            std::thread::spawn(move || xtree_compiler::lower(&expr).map(|p| format!("{:?}", p)))
        })
        .collect();
    let outputs: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked").expect("lowering failed"))
        .collect();
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    assert!(outputs[0].contains(&x.name));
}

#[test]
fn lowered_tree_survives_json_round_trip() {
    let elements = (0..6).map(|i| Expr::constant(Constant::I32(i * i))).collect();
    let array = Expr::new_array_init(Type::I32, [3, 2], elements).unwrap();
    let prim = xtree_compiler::lower(&array).unwrap();

    let json = serde_json::to_string(&prim).expect("serialize");
    let back: Prim = serde_json::from_str(&json).expect("deserialize");

    let original = Vm::new().eval(&prim).unwrap();
    let restored = Vm::new().eval(&back).unwrap();
    let (a, b) = (original.as_array().unwrap().borrow(), restored.as_array().unwrap().borrow());
    assert_eq!(a.values(), b.values());
    assert_eq!(a.get(&[2, 1]).unwrap(), Value::I32(25));
}
