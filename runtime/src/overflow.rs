//! Overflow predicates for the short integer fast paths.
//!
//! Each predicate answers whether the native result may be wrong. They are
//! allowed to say yes for a result that would have fit (the boxed path then
//! computes the same number) but never no for one that does not.

use mrt_object::{VALUE_BITS, Value};

/// Largest operand magnitude for which the native product of two short
/// integers always fits: `(2^31 - 1)^2 < 2^62`.
pub const SAFE_MUL_BOUND: i64 = (1 << 31) - 1;

/// `result` is the wrapping sum of the raw words of `left` and `right`.
/// Overflow iff the result's sign differs from both operands' signs.
#[inline(always)]
pub const fn is_add_overflow(left: Value, right: Value, result: Value) -> bool {
    let l = left.raw_signed();
    let r = right.raw_signed();
    let res = result.raw_signed();
    (res ^ l) < 0 && (res ^ r) < 0
}

/// `result` is the wrapping difference `left - right` of the raw words.
#[inline(always)]
pub const fn is_sub_overflow(left: Value, right: Value, result: Value) -> bool {
    let l = left.raw_signed();
    let r = right.raw_signed();
    let res = result.raw_signed();
    (res ^ l) < 0 && (res ^ r) >= 0
}

/// Operands are untagged.
#[inline(always)]
pub const fn is_potential_mul_overflow(left: i64, right: i64) -> bool {
    left.unsigned_abs() > SAFE_MUL_BOUND as u64 || right.unsigned_abs() > SAFE_MUL_BOUND as u64
}

/// Native division only handles the case where truncating and floor
/// division agree and the divisor is non-zero.
#[inline(always)]
pub const fn is_potential_floor_div_overflow(left: i64, right: i64) -> bool {
    left < 0 || right <= 0
}

#[inline(always)]
pub const fn is_potential_mod_overflow(left: i64, right: i64) -> bool {
    left < 0 || right <= 0
}

/// `raw` is the tagged word of the shifted operand, `count` the untagged
/// shift count. Shifting the tagged word keeps the tag bit clear, so the
/// shift is exact iff shifting back arithmetically restores it.
#[inline(always)]
pub const fn is_shl_overflow(raw: i64, count: i64) -> bool {
    if count < 0 || count >= VALUE_BITS as i64 {
        return true;
    }
    ((raw << count) >> count) != raw
}

#[inline(always)]
pub const fn is_shr_overflow(count: i64) -> bool {
    count < 0 || count >= VALUE_BITS as i64
}

/// `-SHORT_MIN` is one past `SHORT_MAX`.
#[inline(always)]
pub const fn is_neg_overflow(operand: i64) -> bool {
    operand == mrt_object::SHORT_MIN
}
