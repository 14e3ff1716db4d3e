//! Integer operations called from generated code.
//!
//! Each operation works on the tagged words directly when both operands
//! are short and the matching predicate in [`crate::overflow`] says the
//! native result is exact. Everything else, including boxed operands, goes
//! through [`crate::boxed`], which returns short results whenever they fit.

use std::{cmp::Ordering, fmt, str::FromStr};

use mrt_object::{Env, Value};

use crate::{RuntimeError, boxed, overflow::*};

#[cold]
#[inline(never)]
fn routed(op: &str, left: Value, right: Value) {
    log::trace!("{op}: {left:?}, {right:?} routed to boxed path");
}

// ── Arithmetic ─────────────────────────────────────────────────────

#[inline]
pub fn int_add(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        let result = Value::from_raw(left.raw().wrapping_add(right.raw()));
        if !is_add_overflow(left, right, result) {
            return result;
        }
    }
    routed("add", left, right);
    boxed::add(env, left, right)
}

#[inline]
pub fn int_sub(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        let result = Value::from_raw(left.raw().wrapping_sub(right.raw()));
        if !is_sub_overflow(left, right, result) {
            return result;
        }
    }
    routed("sub", left, right);
    boxed::sub(env, left, right)
}

#[inline]
pub fn int_mul(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        let (a, b) = (left.to_i64(), right.to_i64());
        if !is_potential_mul_overflow(a, b) {
            return Value::from_i64(a * b);
        }
    }
    routed("mul", left, right);
    boxed::mul(env, left, right)
}

/// Division rounding toward negative infinity. Division by zero yields
/// `Value::ERROR`.
#[inline]
pub fn int_floor_div(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        let (a, b) = (left.to_i64(), right.to_i64());
        if !is_potential_floor_div_overflow(a, b) {
            return Value::from_i64(a / b);
        }
    }
    routed("floor_div", left, right);
    boxed::floor_div(env, left, right)
}

/// Remainder of [`int_floor_div`]; takes the sign of the divisor.
#[inline]
pub fn int_mod(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        let (a, b) = (left.to_i64(), right.to_i64());
        if !is_potential_mod_overflow(a, b) {
            return Value::from_i64(a % b);
        }
    }
    routed("mod", left, right);
    boxed::modulo(env, left, right)
}

#[inline]
pub fn int_neg(env: &mut Env, operand: Value) -> Value {
    if let Some(n) = operand.as_short()
        && !is_neg_overflow(n)
    {
        return Value::from_i64(-n);
    }
    routed("neg", operand, Value::NONE);
    boxed::neg(env, operand)
}

/// `!n == -n - 1`, which is always representable for short `n`.
#[inline]
pub fn int_invert(env: &mut Env, operand: Value) -> Value {
    if operand.is_short() {
        return Value::from_raw(!operand.raw() & !1);
    }
    routed("invert", operand, Value::NONE);
    boxed::invert(env, operand)
}

// ── Bitwise ────────────────────────────────────────────────────────

// The tag bit is 0 for both operands, so it stays 0 in the raw result.

#[inline]
pub fn int_and(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        return Value::from_raw(left.raw() & right.raw());
    }
    routed("and", left, right);
    boxed::and(env, left, right)
}

#[inline]
pub fn int_or(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        return Value::from_raw(left.raw() | right.raw());
    }
    routed("or", left, right);
    boxed::or(env, left, right)
}

#[inline]
pub fn int_xor(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        return Value::from_raw(left.raw() ^ right.raw());
    }
    routed("xor", left, right);
    boxed::xor(env, left, right)
}

/// Negative counts yield `Value::ERROR`.
#[inline]
pub fn int_shl(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        let (raw, count) = (left.raw_signed(), right.to_i64());
        if !is_shl_overflow(raw, count) {
            return Value::from_raw((raw << count) as u64);
        }
    }
    routed("shl", left, right);
    boxed::shl(env, left, right)
}

/// Arithmetic shift. Negative counts yield `Value::ERROR`.
#[inline]
pub fn int_shr(env: &mut Env, left: Value, right: Value) -> Value {
    if left.is_short() && right.is_short() {
        let (a, count) = (left.to_i64(), right.to_i64());
        if !is_shr_overflow(count) {
            return Value::from_i64(a >> count);
        }
    }
    routed("shr", left, right);
    boxed::shr(env, left, right)
}

// ── Comparison ─────────────────────────────────────────────────────

/// Ordering of two integers. Non-integer operands are unordered and every
/// ordering test on them is false.
#[inline(always)]
fn short_cmp(left: Value, right: Value) -> Option<Ordering> {
    if left == right {
        return Some(Ordering::Equal);
    }
    if left.is_short() && right.is_short() {
        return Some(left.raw_signed().cmp(&right.raw_signed()));
    }
    boxed::compare(left, right)
}

#[inline]
pub fn short_eq(left: Value, right: Value) -> bool {
    short_cmp(left, right) == Some(Ordering::Equal)
}

#[inline]
pub fn short_ne(left: Value, right: Value) -> bool {
    !short_eq(left, right)
}

#[inline]
pub fn short_lt(left: Value, right: Value) -> bool {
    short_cmp(left, right) == Some(Ordering::Less)
}

#[inline]
pub fn short_le(left: Value, right: Value) -> bool {
    matches!(short_cmp(left, right), Some(Ordering::Less | Ordering::Equal))
}

#[inline]
pub fn short_gt(left: Value, right: Value) -> bool {
    short_cmp(left, right) == Some(Ordering::Greater)
}

#[inline]
pub fn short_ge(left: Value, right: Value) -> bool {
    matches!(short_cmp(left, right), Some(Ordering::Greater | Ordering::Equal))
}

// ── Operator tables ────────────────────────────────────────────────

/// Binary integer operators by their source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl IntOp {
    pub const ALL: [IntOp; 10] = [
        IntOp::Add,
        IntOp::Sub,
        IntOp::Mul,
        IntOp::FloorDiv,
        IntOp::Mod,
        IntOp::And,
        IntOp::Or,
        IntOp::Xor,
        IntOp::Shl,
        IntOp::Shr,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            IntOp::Add => "+",
            IntOp::Sub => "-",
            IntOp::Mul => "*",
            IntOp::FloorDiv => "//",
            IntOp::Mod => "%",
            IntOp::And => "&",
            IntOp::Or => "|",
            IntOp::Xor => "^",
            IntOp::Shl => "<<",
            IntOp::Shr => ">>",
        }
    }

    pub fn apply(self, env: &mut Env, left: Value, right: Value) -> Value {
        let op: fn(&mut Env, Value, Value) -> Value = match self {
            IntOp::Add => int_add,
            IntOp::Sub => int_sub,
            IntOp::Mul => int_mul,
            IntOp::FloorDiv => int_floor_div,
            IntOp::Mod => int_mod,
            IntOp::And => int_and,
            IntOp::Or => int_or,
            IntOp::Xor => int_xor,
            IntOp::Shl => int_shl,
            IntOp::Shr => int_shr,
        };
        op(env, left, right)
    }

    /// Whether [`IntOp::apply`] would leave the native fast path for these
    /// operands.
    pub fn takes_boxed_path(self, left: Value, right: Value) -> bool {
        let (Some(a), Some(b)) = (left.as_short(), right.as_short()) else {
            return true;
        };
        match self {
            IntOp::Add => {
                is_add_overflow(left, right, Value::from_raw(left.raw().wrapping_add(right.raw())))
            }
            IntOp::Sub => {
                is_sub_overflow(left, right, Value::from_raw(left.raw().wrapping_sub(right.raw())))
            }
            IntOp::Mul => is_potential_mul_overflow(a, b),
            IntOp::FloorDiv => is_potential_floor_div_overflow(a, b),
            IntOp::Mod => is_potential_mod_overflow(a, b),
            IntOp::And | IntOp::Or | IntOp::Xor => false,
            IntOp::Shl => is_shl_overflow(left.raw_signed(), b),
            IntOp::Shr => is_shr_overflow(b),
        }
    }
}

impl FromStr for IntOp {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntOp::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| RuntimeError::UnknownOperator(s.to_owned()))
    }
}

impl fmt::Display for IntOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Ge,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    pub fn apply(self, left: Value, right: Value) -> bool {
        match self {
            CompareOp::Eq => short_eq(left, right),
            CompareOp::Ne => short_ne(left, right),
            CompareOp::Lt => short_lt(left, right),
            CompareOp::Le => short_le(left, right),
            CompareOp::Gt => short_gt(left, right),
            CompareOp::Ge => short_ge(left, right),
        }
    }
}

impl FromStr for CompareOp {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompareOp::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| RuntimeError::UnknownOperator(s.to_owned()))
    }
}
