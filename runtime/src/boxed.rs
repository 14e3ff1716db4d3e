//! Boxed integers: the arbitrary precision slow path.
//!
//! A boxed integer is an instance of [`INT_TYPE`] whose payload is a
//! `BigInt` stored right after the header. Every operation here accepts
//! short and boxed operands alike and normalizes its result: a value that
//! fits the short range always comes back short. Non-integer operands and
//! undefined results yield `Value::ERROR`.

use std::{cmp::Ordering, ptr};

use mrt_object::{
    Env, InstanceHeader, MethodFn, SHORT_MAX, SHORT_MIN, TypeRepr, Value, try_type_of,
};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::builtins::object_init;

/// Largest left shift the boxed path will materialize.
pub const MAX_SHIFT_BITS: u64 = 1 << 24;

static INT_VTABLE: [MethodFn; 1] = [object_init];

/// The builtin `int` type. Short integers dispatch through it as well.
pub static INT_TYPE: TypeRepr = TypeRepr::new("builtins.int", 0, &INT_VTABLE);

#[repr(C)]
pub struct BoxedInt {
    header: InstanceHeader,
    value: BigInt,
}

impl BoxedInt {
    #[inline]
    pub fn value(&self) -> &BigInt {
        &self.value
    }
}

/// Box `value` without normalizing. Allocation is permanent and the payload
/// is never dropped.
pub fn box_int(env: &mut Env, value: BigInt) -> Value {
    let instance = env.allocate(size_of::<BoxedInt>());
    let boxed = BoxedInt {
        header: InstanceHeader::new(&INT_TYPE),
        value,
    };
    // SAFETY: fresh, 8-byte aligned allocation of the right size
    unsafe { ptr::write(instance.as_ptr::<BoxedInt>(), boxed) };
    instance
}

/// Encode `value` as a short integer if it fits, box it otherwise.
pub fn from_bigint(env: &mut Env, value: BigInt) -> Value {
    match value.to_i64() {
        Some(n) if (SHORT_MIN..=SHORT_MAX).contains(&n) => Value::from_i64(n),
        _ => box_int(env, value),
    }
}

/// Raw allocations whose header was never initialized are not integers.
pub fn is_boxed_int(value: Value) -> bool {
    // SAFETY: heap references always cover at least a header
    value.is_heap_ref() && unsafe { try_type_of(value) }.is_some_and(|ty| ty.is(&INT_TYPE))
}

/// Payload of a boxed integer, if `value` is one.
pub fn boxed_value<'a>(value: Value) -> Option<&'a BigInt> {
    if !is_boxed_int(value) {
        return None;
    }
    // SAFETY: checked above that the instance was written by `box_int`
    Some(unsafe { (*value.as_ptr::<BoxedInt>()).value() })
}

/// The integer `value` denotes, short or boxed.
pub fn to_bigint(value: Value) -> Option<BigInt> {
    match value.as_short() {
        Some(n) => Some(BigInt::from(n)),
        None => boxed_value(value).cloned(),
    }
}

/// Whether `value` is an integer in either representation.
pub fn is_int(value: Value) -> bool {
    value.is_short() || is_boxed_int(value)
}

fn binary(
    env: &mut Env,
    left: Value,
    right: Value,
    op: impl FnOnce(BigInt, BigInt) -> Option<BigInt>,
) -> Value {
    let (Some(a), Some(b)) = (to_bigint(left), to_bigint(right)) else {
        return Value::ERROR;
    };
    match op(a, b) {
        Some(result) => from_bigint(env, result),
        None => Value::ERROR,
    }
}

fn unary(env: &mut Env, operand: Value, op: impl FnOnce(BigInt) -> BigInt) -> Value {
    match to_bigint(operand) {
        Some(a) => from_bigint(env, op(a)),
        None => Value::ERROR,
    }
}

/// Quotient and remainder rounded toward negative infinity.
fn floor_div_mod(a: &BigInt, b: &BigInt) -> Option<(BigInt, BigInt)> {
    if b.is_zero() {
        return None;
    }
    let q = a / b;
    let r = a % b;
    if !r.is_zero() && r.is_negative() != b.is_negative() {
        Some((q - 1, r + b))
    } else {
        Some((q, r))
    }
}

// ── Arithmetic ─────────────────────────────────────────────────────

pub fn add(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, b| Some(a + b))
}

pub fn sub(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, b| Some(a - b))
}

pub fn mul(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, b| Some(a * b))
}

/// Division by zero yields `Value::ERROR`.
pub fn floor_div(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, b| floor_div_mod(&a, &b).map(|(q, _)| q))
}

/// The result takes the sign of the divisor.
pub fn modulo(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, b| floor_div_mod(&a, &b).map(|(_, r)| r))
}

pub fn neg(env: &mut Env, operand: Value) -> Value {
    unary(env, operand, |a| -a)
}

pub fn invert(env: &mut Env, operand: Value) -> Value {
    unary(env, operand, |a| !a)
}

// ── Bitwise ────────────────────────────────────────────────────────

pub fn and(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, b| Some(a & b))
}

pub fn or(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, b| Some(a | b))
}

pub fn xor(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, b| Some(a ^ b))
}

/// Negative counts and shifts past [`MAX_SHIFT_BITS`] of a non-zero value
/// yield `Value::ERROR`.
pub fn shl(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, count| {
        if count.is_negative() {
            return None;
        }
        if a.is_zero() {
            return Some(a);
        }
        match count.to_u64() {
            Some(bits) if bits <= MAX_SHIFT_BITS => Some(a << bits),
            _ => None,
        }
    })
}

/// Arithmetic shift: rounds toward negative infinity. Negative counts
/// yield `Value::ERROR`.
pub fn shr(env: &mut Env, left: Value, right: Value) -> Value {
    binary(env, left, right, |a, count| {
        if count.is_negative() {
            return None;
        }
        match count.to_u64() {
            Some(bits) if bits < a.bits() + 1 => Some(a >> bits),
            _ if a.is_negative() => Some(BigInt::from(-1)),
            _ => Some(BigInt::zero()),
        }
    })
}

// ── Comparison ─────────────────────────────────────────────────────

/// Numeric ordering of two integers in any representation. `None` if
/// either operand is not an integer.
pub fn compare(left: Value, right: Value) -> Option<Ordering> {
    match (left.as_short(), right.as_short()) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        (Some(a), None) => Some(BigInt::from(a).cmp(boxed_value(right)?)),
        (None, Some(b)) => Some(boxed_value(left)?.cmp(&BigInt::from(b))),
        (None, None) => Some(boxed_value(left)?.cmp(boxed_value(right)?)),
    }
}
