use crate::TypeRepr;

/// The hidden 16-byte header in front of every instance's slots.
///
/// ```text
/// [ty: *const TypeRepr 8B] [gcinfo: u64 8B] [slot_0 8B] [slot_1 8B] ...
/// ```
///
/// `ty` is borrowed, never owned: type descriptors outlive every instance.
/// `gcinfo` is reserved for collector bookkeeping and is zero until a
/// collector exists.
#[repr(C)]
pub struct InstanceHeader {
    ty: *const TypeRepr,
    gcinfo: u64,
}

const _: () = assert!(size_of::<InstanceHeader>() == 16);

impl InstanceHeader {
    #[inline(always)]
    pub const fn new(ty: &'static TypeRepr) -> Self {
        Self {
            ty: ty as *const TypeRepr,
            gcinfo: 0,
        }
    }

    #[inline(always)]
    pub fn ty(&self) -> &'static TypeRepr {
        debug_assert!(!self.ty.is_null(), "header read before init_instance");
        // SAFETY: headers are only written by `new`, from a 'static reference
        unsafe { &*self.ty }
    }

    /// `None` while the header has not been written by `init_instance`.
    #[inline(always)]
    pub fn try_ty(&self) -> Option<&'static TypeRepr> {
        // SAFETY: a non-null `ty` was written by `new` from a 'static reference
        unsafe { self.ty.as_ref() }
    }

    #[inline(always)]
    pub fn gcinfo(&self) -> u64 {
        self.gcinfo
    }
}

impl core::fmt::Debug for InstanceHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = self.try_ty().map_or("<uninitialized>", TypeRepr::full_name);
        f.debug_struct("InstanceHeader")
            .field("ty", &name)
            .field("gcinfo", &self.gcinfo)
            .finish()
    }
}
