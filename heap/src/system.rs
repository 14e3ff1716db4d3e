use std::ptr::NonNull;

#[cfg(unix)]
#[allow(unused)]
mod unix {
    use core::ffi::c_void;

    pub const PROT_READ: i32 = 0x1;
    pub const PROT_WRITE: i32 = 0x2;

    pub const MAP_PRIVATE: i32 = 0x02;

    #[cfg(target_os = "linux")]
    pub const MAP_ANON: i32 = 0x20;
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    pub const MAP_ANON: i32 = 0x1000;

    pub const MAP_FAILED: isize = -1;

    unsafe extern "C" {
        pub fn mmap(
            addr: *mut c_void,
            length: usize,
            prot: i32,
            flags: i32,
            fd: i32,
            offset: isize,
        ) -> *mut c_void;
    }

    /// Anonymous, private, read-write mapping. The kernel hands these out
    /// zero-filled and page aligned.
    /// # Safety
    /// null must be checked
    #[inline]
    pub unsafe fn anonymous_mmap(len: usize) -> *mut u8 {
        // SAFETY: no address hint, no file descriptor
        let p = unsafe {
            mmap(
                core::ptr::null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANON,
                -1,
                0,
            )
        };
        if (p as isize) == MAP_FAILED {
            core::ptr::null_mut()
        } else {
            p as *mut u8
        }
    }
}

#[cfg(not(unix))]
mod fallback {
    use std::alloc::{Layout, alloc_zeroed};

    /// # Safety
    /// null must be checked
    pub unsafe fn anonymous_mmap(len: usize) -> *mut u8 {
        match Layout::from_size_align(len, super::OS_PAGE_SIZE) {
            // SAFETY: len is never zero, callers round up to a page
            Ok(layout) => unsafe { alloc_zeroed(layout) },
            Err(_) => core::ptr::null_mut(),
        }
    }
}

pub const OS_PAGE_SIZE: usize = 4096;

/// Round `size` up to a whole number of OS pages.
#[inline]
pub const fn page_align(size: usize) -> usize {
    (size + OS_PAGE_SIZE - 1) & !(OS_PAGE_SIZE - 1)
}

/// Map `size` bytes of zeroed, page aligned memory.
///
/// Mapped memory is never returned to the system.
#[must_use]
pub fn map_memory(size: usize) -> Option<NonNull<u8>> {
    debug_assert!(size > 0 && size % OS_PAGE_SIZE == 0);
    #[cfg(unix)]
    // SAFETY: result is null checked below
    let ptr = unsafe { unix::anonymous_mmap(size) };
    #[cfg(not(unix))]
    // SAFETY: result is null checked below
    let ptr = unsafe { fallback::anonymous_mmap(size) };
    NonNull::new(ptr)
}
