//! Instance layout and slot access.
//!
//! An instance is a tagged reference to an [`InstanceHeader`] followed by
//! `num_slots` tagged words. Everything here trusts the caller: the
//! reference must not be a sentinel and slot indices must be below the
//! type's `num_slots`. Both are only checked in debug builds.

use core::ptr;

use crate::{Env, InstanceHeader, TypeRepr, Value};

/// Byte offset of slot 0 from the start of the instance.
pub const SLOTS_OFFSET: usize = size_of::<InstanceHeader>();

/// Address of the header behind `instance`. Pure arithmetic.
#[inline(always)]
pub fn header_ptr(instance: Value) -> *mut InstanceHeader {
    instance.as_ptr()
}

/// Address of slot `index` of `instance`. Pure arithmetic, not bounds
/// checked.
#[inline(always)]
pub fn slot_ptr(instance: Value, index: usize) -> *mut Value {
    let base = header_ptr(instance) as *mut u8;
    base.wrapping_add(SLOTS_OFFSET + index * size_of::<Value>()) as *mut Value
}

/// # Safety
///
/// `instance` must be a heap reference to an initialized instance.
#[inline(always)]
pub unsafe fn header<'a>(instance: Value) -> &'a InstanceHeader {
    debug_assert!(instance.is_heap_ref(), "header of {instance:?}");
    // SAFETY: by contract
    unsafe { &*header_ptr(instance) }
}

/// Runtime type of `instance`.
///
/// # Safety
///
/// Same as [`header`].
#[inline(always)]
pub unsafe fn type_of(instance: Value) -> &'static TypeRepr {
    // SAFETY: by contract
    unsafe { header(instance) }.ty()
}

/// Runtime type of `instance`, or `None` if its header was never
/// initialized (raw memory straight from `Env::allocate`).
///
/// # Safety
///
/// `instance` must be a heap reference to at least a header's worth of
/// memory from the heap.
#[inline(always)]
pub unsafe fn try_type_of(instance: Value) -> Option<&'static TypeRepr> {
    debug_assert!(instance.is_heap_ref(), "try_type_of on {instance:?}");
    // SAFETY: by contract the header is readable; heap memory starts zeroed
    unsafe { &*header_ptr(instance) }.try_ty()
}

/// Write the header of a freshly allocated instance: record `ty` and zero
/// the collector word.
///
/// # Safety
///
/// `instance` must be a heap reference to at least
/// `ty.instance_size()` writable bytes.
#[inline(always)]
pub unsafe fn init_instance(instance: Value, ty: &'static TypeRepr) {
    debug_assert!(instance.is_heap_ref(), "init_instance on {instance:?}");
    // SAFETY: by contract the header fits
    unsafe { ptr::write(header_ptr(instance), InstanceHeader::new(ty)) }
}

/// Read slot `index`. Assumes `instance != Value::NONE`.
///
/// # Safety
///
/// `instance` must be an initialized instance and `index` below its
/// type's `num_slots`.
#[inline(always)]
pub unsafe fn get_slot(instance: Value, index: usize) -> Value {
    debug_assert!(instance.is_heap_ref(), "get_slot on {instance:?}");
    // SAFETY: by contract
    debug_assert!(index < unsafe { type_of(instance) }.num_slots());
    // SAFETY: by contract the slot is in bounds
    unsafe { ptr::read(slot_ptr(instance, index)) }
}

/// Write slot `index`. Assumes `instance != Value::NONE`.
///
/// # Safety
///
/// Same as [`get_slot`].
#[inline(always)]
pub unsafe fn set_slot(instance: Value, index: usize, value: Value) {
    debug_assert!(instance.is_heap_ref(), "set_slot on {instance:?}");
    // SAFETY: by contract
    debug_assert!(index < unsafe { type_of(instance) }.num_slots());
    // TODO: call the collector's write barrier here once instances can move
    // SAFETY: by contract the slot is in bounds
    unsafe { ptr::write(slot_ptr(instance, index), value) }
}

/// Allocate an instance of `ty`, write its header and zero its slots.
pub fn allocate_instance(env: &mut Env, ty: &'static TypeRepr) -> Value {
    let instance = env.allocate(ty.instance_size());
    // SAFETY: just allocated with room for the header and every slot
    unsafe {
        init_instance(instance, ty);
        for index in 0..ty.num_slots() {
            ptr::write(slot_ptr(instance, index), Value::ZERO);
        }
    }
    instance
}
