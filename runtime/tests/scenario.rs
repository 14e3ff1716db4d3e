//! End to end: instances built and dispatched the way generated code does.

use mrt::{
    Env, EnvCreateInfo, Heap, HeapSettings, INT_TYPE, MethodFn, OBJECT_TYPE, TypeRegistry,
    TypeRepr, Value, allocate_instance, boxed, call_virtual, format_value, get_slot, int_add,
    invoke_virtual, object_init, runtime_type, set_slot, short_eq, type_of,
};

const VALUE: usize = 0;
const NEXT: usize = 1;
const DESCRIBE: usize = 2;

fn test_env() -> Env {
    let heap = Heap::new(HeapSettings {
        chunk_size: 64 * 1024,
        large_size: 16 * 1024,
        max_size: 16 * 1024 * 1024,
    })
    .expect("heap");
    Env::new(&heap, &EnvCreateInfo::default())
}

fn self_slot(env: &mut Env, index: usize) -> Value {
    let this = env.local(0);
    unsafe { get_slot(this, index) }
}

fn counter_next(env: &mut Env) -> Value {
    let value = self_slot(env, VALUE);
    int_add(env, value, Value::from_i64(1))
}

fn counter_describe(_env: &mut Env) -> Value {
    Value::from_i64(1)
}

fn doubler_next(env: &mut Env) -> Value {
    let value = self_slot(env, VALUE);
    int_add(env, value, value)
}

fn doubler_describe(_env: &mut Env) -> Value {
    Value::from_i64(2)
}

static COUNTER_VTABLE: [MethodFn; 3] = [object_init, counter_next, counter_describe];
static COUNTER: TypeRepr = TypeRepr::new("test.Counter", 2, &COUNTER_VTABLE);

/// Two slots, one method: `self.slot0 + 1`.
static PLUS_ONE_VTABLE: [MethodFn; 1] = [counter_next];
static PLUS_ONE: TypeRepr = TypeRepr::new("test.PlusOne", 2, &PLUS_ONE_VTABLE);

static DOUBLER_VTABLE: [MethodFn; 3] = [object_init, doubler_next, doubler_describe];
static DOUBLER: TypeRepr = TypeRepr::new("test.Doubler", 1, &DOUBLER_VTABLE);

// ── Scenario ──────────────────────────────────────────────────────────

#[test]
fn slot_plus_one_through_vtable() {
    let mut env = test_env();
    let obj = allocate_instance(&mut env, &PLUS_ONE);
    unsafe {
        assert_eq!(mrt::header(obj).gcinfo(), 0);
        assert!(type_of(obj).is(&PLUS_ONE));
        assert_eq!(type_of(obj).num_slots(), 2);
        assert_eq!(type_of(obj).vtable().len(), 1);
        set_slot(obj, 0, Value::from_i64(41));
        set_slot(obj, 1, Value::NONE);
    }

    let saved = env.enter_frame(&[obj]);
    let result = invoke_virtual(&mut env, obj, 0);
    env.leave_frame(saved);

    assert!(result.is_short());
    assert_eq!(result.to_i64(), 42);
    assert_eq!(format_value(result), "42");
    assert_eq!(env.stack_top(), 0);
    unsafe {
        assert_eq!(get_slot(obj, 0).to_i64(), 41);
        assert!(get_slot(obj, 1).is_none());
    }
}

#[test]
fn counter_next_sits_at_the_same_index_in_every_type() {
    let mut env = test_env();
    let obj = allocate_instance(&mut env, &COUNTER);
    unsafe { set_slot(obj, VALUE, Value::from_i64(41)) };
    assert_eq!(call_virtual(&mut env, obj, NEXT, &[]).to_i64(), 42);
}

#[test]
fn scenario_crosses_into_boxed_integers() {
    let mut env = test_env();
    let obj = allocate_instance(&mut env, &COUNTER);
    unsafe { set_slot(obj, VALUE, Value::from_i64(mrt::SHORT_MAX)) };

    let result = call_virtual(&mut env, obj, NEXT, &[]);
    assert!(boxed::is_boxed_int(result));
    assert_eq!(format_value(result), "4611686018427387904");
    assert!(mrt::short_gt(result, Value::from_i64(mrt::SHORT_MAX)));
}

// ── Polymorphism ──────────────────────────────────────────────────────

#[test]
fn dispatch_uses_the_receivers_type() {
    let mut env = test_env();
    let counter = allocate_instance(&mut env, &COUNTER);
    let doubler = allocate_instance(&mut env, &DOUBLER);
    unsafe {
        set_slot(counter, VALUE, Value::from_i64(10));
        set_slot(doubler, VALUE, Value::from_i64(10));
    }

    let receivers = [counter, doubler];
    let results: Vec<i64> = receivers
        .iter()
        .map(|&r| call_virtual(&mut env, r, NEXT, &[]).to_i64())
        .collect();
    assert_eq!(results, [11, 20]);

    let kinds: Vec<i64> = receivers
        .iter()
        .map(|&r| call_virtual(&mut env, r, DESCRIBE, &[]).to_i64())
        .collect();
    assert_eq!(kinds, [1, 2]);

    for r in receivers {
        assert!(call_virtual(&mut env, r, 0, &[]).is_none());
    }
}

#[test]
fn unwritten_slots_read_as_zero() {
    let mut env = test_env();
    let obj = allocate_instance(&mut env, &COUNTER);
    assert!(unsafe { short_eq(get_slot(obj, VALUE), Value::ZERO) });
    assert_eq!(call_virtual(&mut env, obj, NEXT, &[]).to_i64(), 1);
}

// ── Faults ────────────────────────────────────────────────────────────

fn recording_abort(env: &mut Env) -> Value {
    env.push(Value::from_i64(99));
    Value::ERROR
}

#[test]
fn dispatch_on_none_reaches_abort_hook() {
    let heap = Heap::new(HeapSettings::default()).expect("heap");
    let mut env = Env::new(
        &heap,
        &EnvCreateInfo {
            stack_size: 16,
            abort: recording_abort,
        },
    );

    let saved = env.enter_frame(&[Value::NONE]);
    let result = invoke_virtual(&mut env, Value::NONE, NEXT);
    assert!(result.is_error());
    assert_eq!(env.pop().to_i64(), 99);
    env.leave_frame(saved);
    assert_eq!(env.stack_top(), 0);
}

// ── Registry and builtins ─────────────────────────────────────────────

#[test]
fn registry_knows_builtins_and_user_types() {
    let registry = TypeRegistry::with_builtins();
    registry.insert(&COUNTER).expect("first insert");
    assert!(registry.insert(&COUNTER).is_err());
    assert_eq!(registry.len(), 3);
    assert!(registry.get("test.Counter").is_some_and(|ty| ty.is(&COUNTER)));
}

#[test]
fn builtin_types() {
    let mut env = test_env();
    let obj = allocate_instance(&mut env, &OBJECT_TYPE);
    assert!(runtime_type(obj).is_some_and(|ty| ty.is(&OBJECT_TYPE)));
    assert!(runtime_type(Value::from_i64(0)).is_some_and(|ty| ty.is(&INT_TYPE)));
    assert!(call_virtual(&mut env, obj, 0, &[]).is_none());
}

#[test]
fn independent_contexts_on_threads() {
    let heap = Heap::new(HeapSettings::default()).expect("heap");
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let heap = heap.clone();
            std::thread::spawn(move || {
                let mut env = Env::new(&heap, &EnvCreateInfo::default());
                let obj = allocate_instance(&mut env, &COUNTER);
                unsafe { set_slot(obj, VALUE, Value::from_i64(i)) };
                call_virtual(&mut env, obj, NEXT, &[]).to_i64()
            })
        })
        .collect();
    let mut results: Vec<i64> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();
    results.sort_unstable();
    assert_eq!(results, [1, 2, 3, 4]);
}
