//! Lowering throughput for array initializers and reordered invocations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xtree_compiler::{lower, Expr, LowerOptions, Lowerer, ParameterBinding};
use xtree_core::{Constant, Signature, Type, Var};

fn int_array(bounds: &[i32]) -> Expr {
    let count: i32 = bounds.iter().product();
    let elements = (0..count).map(|i| Expr::constant(Constant::I32(i))).collect();
    Expr::new_array_init(Type::I32, bounds.iter().copied(), elements).unwrap()
}

fn reversed_call(arity: usize) -> Expr {
    let builder = (0..arity).fold(Signature::builder("f"), |b, i| {
        b.param(format!("p{i}"), Type::I32)
    });
    let sig = builder.returns(Type::I32);
    let f = Var::new("f", Type::Fn(sig.clone()));
    let x = Var::new("x", Type::I32);
    let bindings = sig
        .params()
        .iter()
        .rev()
        .map(|p| ParameterBinding::new(p.clone(), Expr::variable(&x)).unwrap())
        .collect();
    Expr::invoke(Expr::variable(&f), bindings).unwrap()
}

fn bench_array_lowering(c: &mut Criterion) {
    let array = int_array(&[16, 16, 4]);
    c.bench_function("lower_array_16x16x4", |b| b.iter(|| lower(black_box(&array))));

    let options = LowerOptions {
        fold_constant_arrays: true,
        ..LowerOptions::default()
    };
    c.bench_function("lower_array_16x16x4_folded", |b| {
        b.iter(|| Lowerer::new(options.clone()).lower(black_box(&array)))
    });
}

fn bench_invocation_lowering(c: &mut Criterion) {
    let call = reversed_call(12);
    c.bench_function("lower_reordered_invoke_12", |b| {
        b.iter(|| lower(black_box(&call)))
    });
}

criterion_group!(benches, bench_array_lowering, bench_invocation_lowering);
criterion_main!(benches);
