use crate::{Env, InstanceHeader, Value};

/// Signature shared by every compiled function and every method table
/// entry. Arguments live in the frame the caller set up on `Env`.
pub type MethodFn = fn(&mut Env) -> Value;

/// Per-type runtime descriptor, shared by all instances of the type.
///
/// Descriptors are immutable and live for the rest of the process. They are
/// either `static` items built with [`TypeRepr::new`] or leaked at
/// initialization time by [`TypeRepr::register`].
///
/// `vtable[i]` is the same logical method in every type that overrides it;
/// the code generator assigns the indices.
pub struct TypeRepr {
    vtable: &'static [MethodFn],
    num_slots: usize,
    full_name: &'static str,
}

impl TypeRepr {
    pub const fn new(
        full_name: &'static str,
        num_slots: usize,
        vtable: &'static [MethodFn],
    ) -> Self {
        Self {
            vtable,
            num_slots,
            full_name,
        }
    }

    /// Build a descriptor at run time and make it immortal.
    pub fn register(
        full_name: &str,
        num_slots: usize,
        vtable: Vec<MethodFn>,
    ) -> &'static TypeRepr {
        let full_name: &'static str = Box::leak(full_name.to_owned().into_boxed_str());
        let vtable: &'static [MethodFn] = Box::leak(vtable.into_boxed_slice());
        log::debug!(
            "registered type {full_name} ({num_slots} slots, {} methods)",
            vtable.len()
        );
        Box::leak(Box::new(Self::new(full_name, num_slots, vtable)))
    }

    #[inline(always)]
    pub fn vtable(&self) -> &'static [MethodFn] {
        self.vtable
    }

    /// Method table entry `index`. Indices come from the code generator and
    /// are trusted; an unknown index panics instead of jumping anywhere.
    #[inline(always)]
    pub fn method(&self, index: usize) -> MethodFn {
        self.vtable[index]
    }

    #[inline(always)]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    #[inline(always)]
    pub fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// Bytes an instance of this type occupies, header included.
    #[inline(always)]
    pub const fn instance_size(&self) -> usize {
        instance_allocation_size(self.num_slots)
    }

    /// Identity comparison. Two descriptors are the same type only if they
    /// are the same object.
    #[inline(always)]
    pub fn is(&self, other: &TypeRepr) -> bool {
        core::ptr::eq(self, other)
    }
}

impl core::fmt::Debug for TypeRepr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeRepr")
            .field("full_name", &self.full_name)
            .field("num_slots", &self.num_slots)
            .field("methods", &self.vtable.len())
            .finish()
    }
}

/// Compute the total allocation size for an instance with `num_slots`
/// slots.
pub const fn instance_allocation_size(num_slots: usize) -> usize {
    size_of::<InstanceHeader>() + num_slots * size_of::<Value>()
}
