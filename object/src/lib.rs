mod env;
mod header;
mod instance;
mod types;
mod value;

pub use env::{AbortFn, Env, EnvCreateInfo, SavedFrame, default_abort};
pub use header::InstanceHeader;
pub use instance::{
    SLOTS_OFFSET, allocate_instance, get_slot, header, header_ptr, init_instance, set_slot,
    slot_ptr, try_type_of, type_of,
};
pub use types::{MethodFn, TypeRepr, instance_allocation_size};
pub use value::{SHORT_MAX, SHORT_MIN, VALUE_BITS, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use mrt_heap::{Heap, HeapSettings};

    fn test_env() -> Env {
        let heap = Heap::new(HeapSettings {
            chunk_size: 64 * 1024,
            large_size: 16 * 1024,
            max_size: 4 * 1024 * 1024,
        })
        .expect("heap");
        Env::new(&heap, &EnvCreateInfo::default())
    }

    fn return_none(_: &mut Env) -> Value {
        Value::NONE
    }

    fn return_error(_: &mut Env) -> Value {
        Value::ERROR
    }

    static POINT_VTABLE: [MethodFn; 1] = [return_none];
    static POINT: TypeRepr = TypeRepr::new("test.Point", 2, &POINT_VTABLE);
    static EMPTY: TypeRepr = TypeRepr::new("test.Empty", 0, &[]);

    // ── Value tagging ──────────────────────────────────────────────

    #[test]
    fn short_round_trip() {
        for &n in &[0i64, 1, -1, 41, -42, SHORT_MAX, SHORT_MIN] {
            let v = Value::from_i64(n);
            assert!(v.is_short());
            assert!(!v.is_ref());
            assert_eq!(v.to_i64(), n);
            assert_eq!(v.raw(), (n << 1) as u64);
        }
    }

    #[test]
    fn short_zero_is_zero_bits() {
        assert_eq!(Value::from_i64(0).raw(), 0);
        assert_eq!(Value::ZERO, Value::from_i64(0));
        assert_eq!(Value::default(), Value::ZERO);
    }

    #[test]
    fn short_range_is_checked() {
        assert!(Value::try_from_i64(SHORT_MAX).is_some());
        assert!(Value::try_from_i64(SHORT_MIN).is_some());
        assert!(Value::try_from_i64(SHORT_MAX + 1).is_none());
        assert!(Value::try_from_i64(SHORT_MIN - 1).is_none());
        assert_eq!(Value::try_from(i64::MAX), Err(i64::MAX));
    }

    #[test]
    fn short_order_matches_raw_order() {
        let values = [SHORT_MIN, -3, -1, 0, 1, 7, SHORT_MAX];
        for pair in values.windows(2) {
            let a = Value::from_i64(pair[0]);
            let b = Value::from_i64(pair[1]);
            assert!(a.raw_signed() < b.raw_signed());
        }
    }

    #[test]
    fn sentinels() {
        assert_eq!(Value::NONE.raw(), 0x1);
        assert_eq!(Value::ERROR.raw(), 0x3);
        for v in [Value::NONE, Value::ERROR] {
            assert!(v.is_ref());
            assert!(!v.is_short());
            assert!(v.is_sentinel());
            assert!(!v.is_heap_ref());
        }
        assert!(Value::NONE.is_none());
        assert!(!Value::NONE.is_error());
        assert!(Value::ERROR.is_error());
        assert_eq!(format!("{:?}", Value::NONE), "None");
        assert_eq!(format!("{:?}", Value::from_i64(-5)), "Short(-5)");
    }

    #[test]
    fn ref_tagging() {
        let dummy: u64 = 0;
        let ptr = &dummy as *const u64;
        let v = Value::from_ptr(ptr);
        assert!(v.is_ref());
        assert!(v.is_heap_ref());
        assert!(!v.is_short());
        assert_eq!(v.ref_bits(), ptr as u64);
        assert_eq!(v.as_ptr::<u64>() as *const u64, ptr);
    }

    // ── Header ─────────────────────────────────────────────────────

    #[test]
    fn header_layout() {
        assert_eq!(size_of::<InstanceHeader>(), 16);
        assert_eq!(SLOTS_OFFSET, 16);
        assert_eq!(instance_allocation_size(0), 16);
        assert_eq!(instance_allocation_size(3), 40);
        assert_eq!(POINT.instance_size(), 32);
    }

    #[test]
    fn header_init_records_type() {
        let mut env = test_env();
        let obj = env.allocate(POINT.instance_size());
        unsafe {
            init_instance(obj, &POINT);
            assert!(type_of(obj).is(&POINT));
            assert_eq!(header(obj).gcinfo(), 0);
        }
    }

    #[test]
    fn uninitialized_header_has_no_type() {
        let mut env = test_env();
        let raw = env.allocate(POINT.instance_size());
        unsafe {
            assert!(try_type_of(raw).is_none());
            init_instance(raw, &POINT);
            assert!(try_type_of(raw).is_some_and(|ty| ty.is(&POINT)));
        }
    }

    #[test]
    fn header_pointer_is_ref_bits() {
        let mut env = test_env();
        let obj = allocate_instance(&mut env, &POINT);
        assert_eq!(header_ptr(obj) as u64, obj.ref_bits());
        assert_eq!(slot_ptr(obj, 1) as u64, obj.ref_bits() + 24);
    }

    // ── Slots ──────────────────────────────────────────────────────

    #[test]
    fn slots_start_zeroed() {
        let mut env = test_env();
        let obj = allocate_instance(&mut env, &POINT);
        unsafe {
            assert_eq!(get_slot(obj, 0), Value::ZERO);
            assert_eq!(get_slot(obj, 1), Value::ZERO);
        }
    }

    #[test]
    fn slot_set_get() {
        let mut env = test_env();
        let obj = allocate_instance(&mut env, &POINT);
        let other = allocate_instance(&mut env, &EMPTY);
        unsafe {
            set_slot(obj, 0, Value::from_i64(41));
            set_slot(obj, 1, other);
            assert_eq!(get_slot(obj, 0).to_i64(), 41);
            assert_eq!(get_slot(obj, 1), other);
            set_slot(obj, 1, Value::NONE);
            assert!(get_slot(obj, 1).is_none());
            assert_eq!(get_slot(obj, 0).to_i64(), 41);
        }
    }

    #[test]
    fn instances_do_not_share_slots() {
        let mut env = test_env();
        let a = allocate_instance(&mut env, &POINT);
        let b = allocate_instance(&mut env, &POINT);
        assert_ne!(a, b);
        unsafe {
            set_slot(a, 0, Value::from_i64(1));
            assert_eq!(get_slot(b, 0), Value::ZERO);
        }
    }

    // ── Types ──────────────────────────────────────────────────────

    #[test]
    fn registered_type_is_immortal() {
        let ty = TypeRepr::register("test.Dynamic", 1, vec![return_error, return_none]);
        assert_eq!(ty.full_name(), "test.Dynamic");
        assert_eq!(ty.num_slots(), 1);
        assert_eq!(ty.vtable().len(), 2);
        let mut env = test_env();
        assert!((ty.method(0))(&mut env).is_error());
        assert!((ty.method(1))(&mut env).is_none());
        assert!(!ty.is(&POINT));
    }

    // ── Env ────────────────────────────────────────────────────────

    #[test]
    fn env_starts_empty() {
        let env = test_env();
        assert_eq!(env.frame(), 0);
        assert_eq!(env.stack_top(), 0);
    }

    #[test]
    fn env_frames_nest_and_restore() {
        let mut env = test_env();
        env.push(Value::from_i64(9));
        let outer = env.enter_frame(&[Value::from_i64(1), Value::from_i64(2)]);
        assert_eq!(env.frame(), 1);
        assert_eq!(env.local(0).to_i64(), 1);
        assert_eq!(env.local(1).to_i64(), 2);

        let inner = env.enter_frame(&[Value::from_i64(3)]);
        assert_eq!(env.frame(), 3);
        assert_eq!(env.local(0).to_i64(), 3);
        env.set_local(0, Value::from_i64(4));
        assert_eq!(env.local(0).to_i64(), 4);
        env.leave_frame(inner);

        assert_eq!(env.frame(), 1);
        assert_eq!(env.stack_top(), 3);
        env.leave_frame(outer);
        assert_eq!(env.frame(), 0);
        assert_eq!(env.stack_top(), 1);
        assert_eq!(env.pop().to_i64(), 9);
    }

    #[test]
    fn env_call_restores_frame() {
        let mut env = test_env();
        let result = env.call(&[Value::from_i64(20), Value::from_i64(22)], |env| {
            Value::from_i64(env.local(0).to_i64() + env.local(1).to_i64())
        });
        assert_eq!(result.to_i64(), 42);
        assert_eq!(env.stack_top(), 0);
        assert_eq!(env.frame(), 0);
    }

    #[test]
    fn env_push_pop() {
        let mut env = test_env();
        let saved = env.enter_frame(&[]);
        env.push(Value::from_i64(1));
        env.push(Value::NONE);
        assert_eq!(env.frame_len(), 2);
        assert!(env.pop().is_none());
        assert_eq!(env.pop().to_i64(), 1);
        env.leave_frame(saved);
    }

    #[test]
    fn env_abort_hook_is_configurable() {
        let mut env = Env::new(
            &Heap::new(HeapSettings::default()).expect("heap"),
            &EnvCreateInfo {
                stack_size: 4,
                abort: return_error,
            },
        );
        assert!(env.abort().is_error());
        env.set_abort(return_none);
        assert!(env.abort().is_none());
    }

    #[test]
    fn env_try_allocate_reports_exhaustion() {
        let heap = Heap::new(HeapSettings {
            chunk_size: 4096,
            large_size: 2048,
            max_size: 8192,
        })
        .expect("heap");
        let mut env = Env::new(&heap, &EnvCreateInfo::default());
        assert!(env.try_allocate(64).is_ok());
        assert!(env.try_allocate(1 << 20).is_err());
    }

    #[test]
    fn env_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Env>();
    }
}
