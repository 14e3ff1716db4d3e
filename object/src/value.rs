/// Tag constants.
const SHORT_MASK: u64 = 0b1;
const REF_TAG: u64 = 0b1;

/// Width of a tagged word in bits.
pub const VALUE_BITS: u32 = u64::BITS;

/// Smallest integer a short value can hold: `-2^62`.
pub const SHORT_MIN: i64 = i64::MIN >> 1;

/// Largest integer a short value can hold: `2^62 - 1`.
pub const SHORT_MAX: i64 = i64::MAX >> 1;

/// A tagged 64-bit word.
///
/// Encoding:
/// - **Short**:     `...XXXXX0`: 63-bit signed integer (low bit 0).
/// - **Reference**: `...XXXXX1`: heap address with the low bit set. Heap
///   addresses are 8-byte aligned, so clearing bit 0 recovers the pointer.
/// - **None** (`0x1`) and **Error** (`0x3`) carry the reference bit but
///   point nowhere. Test for them by equality before dereferencing.
///
/// Short integers keep the order of their signed raw words, so two shorts
/// can be compared without untagging.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

impl Value {
    /// Absence of a value.
    pub const NONE: Value = Value(0x1);

    /// Fast error signal returned in place of a result.
    pub const ERROR: Value = Value(0x3);

    /// The short integer `0`, also what an untouched slot reads as.
    pub const ZERO: Value = Value(0);

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn raw_signed(self) -> i64 {
        self.0 as i64
    }

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    // ── Short integers ─────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_short(self) -> bool {
        self.0 & SHORT_MASK == 0
    }

    /// Encode `n` as a short integer.
    ///
    /// `n` must lie in `SHORT_MIN..=SHORT_MAX`; bits above that range are
    /// shifted out.
    #[inline(always)]
    pub const fn from_i64(n: i64) -> Self {
        debug_assert!(n >= SHORT_MIN && n <= SHORT_MAX, "short overflow");
        Self((n << 1) as u64)
    }

    #[inline(always)]
    pub const fn try_from_i64(n: i64) -> Option<Self> {
        if n >= SHORT_MIN && n <= SHORT_MAX {
            Some(Self((n << 1) as u64))
        } else {
            None
        }
    }

    /// Decode a short integer. Total: on a reference this yields the
    /// address shifted right, which is meaningless but harmless.
    #[inline(always)]
    pub const fn to_i64(self) -> i64 {
        (self.0 as i64) >> 1
    }

    #[inline(always)]
    pub const fn as_short(self) -> Option<i64> {
        if self.is_short() {
            Some(self.to_i64())
        } else {
            None
        }
    }

    // ── References ─────────────────────────────────────────────────

    /// Carries the reference bit. True for the two sentinels as well.
    #[inline(always)]
    pub const fn is_ref(self) -> bool {
        self.0 & REF_TAG == REF_TAG
    }

    #[inline(always)]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    #[inline(always)]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }

    #[inline(always)]
    pub const fn is_sentinel(self) -> bool {
        self.is_none() || self.is_error()
    }

    /// A reference that can be dereferenced.
    #[inline(always)]
    pub const fn is_heap_ref(self) -> bool {
        self.is_ref() && !self.is_sentinel()
    }

    #[inline(always)]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        let addr = ptr as u64;
        debug_assert!(addr & 0b111 == 0, "pointer not aligned");
        debug_assert!(addr != 0, "null reference");
        Self(addr | REF_TAG)
    }

    #[inline(always)]
    pub const fn ref_bits(self) -> u64 {
        self.0 & !REF_TAG
    }

    #[inline(always)]
    pub fn as_ptr<T>(self) -> *mut T {
        self.ref_bits() as *mut T
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<i64> for Value {
    type Error = i64;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Self::try_from_i64(n).ok_or(n)
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_short() {
            write!(f, "Short({})", self.to_i64())
        } else if self.is_none() {
            write!(f, "None")
        } else if self.is_error() {
            write!(f, "Error")
        } else {
            write!(f, "Ref(0x{:x})", self.ref_bits())
        }
    }
}
