//! Fast versus boxed integer paths, and virtual dispatch.
//!
//!   cargo bench --bench int_ops

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use mrt::overflow::SAFE_MUL_BOUND;
use mrt::{
    Env, MethodFn, SHORT_MAX, TypeRepr, Value, allocate_instance, call_virtual, get_slot, int_add,
    int_floor_div, int_mul, int_shl, object_init, set_slot, short_lt,
};

fn counter_next(env: &mut Env) -> Value {
    let this = env.local(0);
    let value = unsafe { get_slot(this, 0) };
    int_add(env, value, Value::from_i64(1))
}

static COUNTER_VTABLE: [MethodFn; 2] = [object_init, counter_next];
static COUNTER: TypeRepr = TypeRepr::new("bench.Counter", 1, &COUNTER_VTABLE);

fn bench_arithmetic(c: &mut Criterion) {
    let mut env = Env::default();
    let small = Value::from_i64(12345);
    let max = Value::from_i64(SHORT_MAX);
    let one = Value::from_i64(1);
    let minus_one = Value::from_i64(-1);
    // boxed operands whose results fit a short, so iterations do not allocate
    let boxed = int_add(&mut env, max, one);
    let above_bound = Value::from_i64(SAFE_MUL_BOUND + 1);

    let mut group = c.benchmark_group("int");
    group.bench_function("add/fast", |b| {
        b.iter(|| int_add(&mut env, black_box(small), black_box(one)))
    });
    group.bench_function("add/boxed", |b| {
        b.iter(|| int_add(&mut env, black_box(boxed), black_box(minus_one)))
    });
    group.bench_function("mul/fast", |b| {
        b.iter(|| int_mul(&mut env, black_box(small), black_box(small)))
    });
    group.bench_function("mul/boxed", |b| {
        b.iter(|| int_mul(&mut env, black_box(above_bound), black_box(Value::from_i64(2))))
    });
    group.bench_function("floor_div/fast", |b| {
        b.iter(|| int_floor_div(&mut env, black_box(max), black_box(small)))
    });
    group.bench_function("shl/fast", |b| {
        b.iter(|| int_shl(&mut env, black_box(small), black_box(Value::from_i64(20))))
    });
    group.bench_function("lt/short", |b| {
        b.iter(|| short_lt(black_box(small), black_box(max)))
    });
    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut env = Env::default();
    let counter = allocate_instance(&mut env, &COUNTER);
    unsafe { set_slot(counter, 0, Value::from_i64(41)) };

    c.bench_function("dispatch/call_virtual", |b| {
        b.iter(|| call_virtual(&mut env, black_box(counter), 1, &[]))
    });
}

criterion_group!(benches, bench_arithmetic, bench_dispatch);
criterion_main!(benches);
