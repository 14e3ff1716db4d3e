use mrt_object::{Env, TypeRepr, Value, try_type_of};

use crate::boxed::INT_TYPE;

/// Runtime type of `value`. Short integers share the boxed integers' type.
/// `None` for the sentinels and for memory whose header was never
/// initialized.
#[inline]
pub fn runtime_type(value: Value) -> Option<&'static TypeRepr> {
    if value.is_short() {
        return Some(&INT_TYPE);
    }
    if value.is_sentinel() {
        return None;
    }
    // SAFETY: heap references always cover at least a header
    unsafe { try_type_of(value) }
}

/// Call method `slot_index` of `receiver`'s type.
///
/// The caller has already set up the frame: local 0 is the receiver, the
/// arguments follow. Dispatch on `None` goes to the abort hook; `Error`
/// propagates without calling anything.
#[inline]
pub fn invoke_virtual(env: &mut Env, receiver: Value, slot_index: usize) -> Value {
    if receiver.is_none() {
        return env.abort();
    }
    let Some(ty) = runtime_type(receiver) else {
        return Value::ERROR;
    };
    let method = ty.method(slot_index);
    method(env)
}

/// Open a frame holding `receiver` and `args`, dispatch, and close it.
pub fn call_virtual(env: &mut Env, receiver: Value, slot_index: usize, args: &[Value]) -> Value {
    let saved = env.enter_frame(&[receiver]);
    for &arg in args {
        env.push(arg);
    }
    let result = invoke_virtual(env, receiver, slot_index);
    env.leave_frame(saved);
    result
}
