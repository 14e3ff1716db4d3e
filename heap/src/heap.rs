//! Permanent process heap.
//!
//! Memory is mapped from the system in chunks and handed out by bump
//! allocation. Nothing is ever freed, moved or unmapped: an allocation lives
//! until the process exits. Every call chain allocates through its own
//! [`HeapProxy`], which owns the unused tail of one chunk, so the shared
//! state is only locked when a proxy needs a fresh chunk.
//!
//! Call sites only see the [`Allocator`] trait. A collecting heap can be
//! dropped in behind it later without touching them.

use std::{
    alloc::Layout,
    ops::Deref,
    ptr::{self, NonNull},
    sync::{
        Arc, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{AllocError, OS_PAGE_SIZE, system};

/// Every allocation is aligned to at least this many bytes. Tagged
/// references rely on it: the low bits of a heap address are always free
/// and no address can collide with the reserved codes below 8.
pub const HEAP_ALIGN: usize = 8;

static GLOBAL: OnceLock<Heap> = OnceLock::new();

// ── Heap settings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapSettings {
    /// Size of a regular chunk. Must be a multiple of the OS page size.
    pub chunk_size: usize,
    /// Requests of at least this size get a chunk of their own.
    pub large_size: usize,
    /// Upper bound for all mapped memory. Exceeding it is exhaustion.
    pub max_size: usize,
}

impl Default for HeapSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1 << 20,    // 1 MB
            large_size: 64 * 1024,  // 64 KB
            max_size: 4 << 30,      // 4 GB
        }
    }
}

impl HeapSettings {
    pub fn validate(&self) -> Result<(), AllocError> {
        if self.chunk_size == 0 || self.large_size == 0 {
            return Err(AllocError::InvalidSettings("sizes must be > 0"));
        }
        if !self.chunk_size.is_multiple_of(OS_PAGE_SIZE) {
            return Err(AllocError::InvalidSettings(
                "chunk_size must match OS page alignment",
            ));
        }
        if self.large_size > self.chunk_size {
            return Err(AllocError::InvalidSettings(
                "large_size must be smaller or equal to chunk_size",
            ));
        }
        if self.max_size < self.chunk_size {
            return Err(AllocError::InvalidSettings(
                "max_size must hold at least one chunk",
            ));
        }
        Ok(())
    }
}

/// Optional overrides applied on top of [`HeapSettings::default`].
#[derive(Debug, Default, Clone)]
pub struct HeapCreateInfo {
    pub chunk_size: Option<usize>,
    pub large_size: Option<usize>,
    pub max_size: Option<usize>,
}

impl HeapCreateInfo {
    pub fn settings(&self) -> HeapSettings {
        let mut settings = HeapSettings::default();
        self.chunk_size.inspect(|&val| settings.chunk_size = val);
        self.large_size.inspect(|&val| settings.large_size = val);
        self.max_size.inspect(|&val| settings.max_size = val);
        settings
    }
}

// ── Shared state ──────────────────────────────────────────────────────

/// A region mapped from the system. Chunks are never returned.
#[derive(Debug, Clone, Copy)]
pub struct Chunk {
    pub start: NonNull<u8>,
    pub size: usize,
}

impl Chunk {
    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.start.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= start && addr < start + self.size
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub chunks: usize,
    pub mapped_bytes: usize,
    /// Bytes handed out by proxies that have flushed their counters.
    pub allocated_bytes: usize,
}

#[derive(Debug)]
pub struct HeapInner {
    pub settings: HeapSettings,
    chunks: Mutex<Vec<Chunk>>,
    mapped: AtomicUsize,
    allocated: AtomicUsize,
}

// SAFETY: chunk pointers are only published under the mutex and the memory
// behind them is owned by the heap for the rest of the process
unsafe impl Send for HeapInner {}
// SAFETY: see above
unsafe impl Sync for HeapInner {}

impl HeapInner {
    fn new(settings: HeapSettings) -> Self {
        Self {
            settings,
            chunks: Mutex::new(Vec::new()),
            mapped: AtomicUsize::new(0),
            allocated: AtomicUsize::new(0),
        }
    }

    /// Map a chunk that can hold at least `min_size` bytes. Regular chunks
    /// are at least `chunk_size`; `exact` chunks are `min_size` rounded up
    /// to whole pages.
    pub fn request_chunk(&self, min_size: usize, exact: bool) -> Result<Chunk, AllocError> {
        let size = if exact {
            system::page_align(min_size)
        } else {
            system::page_align(min_size.max(self.settings.chunk_size))
        };
        let mut chunks = self.chunks.lock();

        let mapped = self.mapped.load(Ordering::Relaxed);
        let limit = self.settings.max_size;
        let err = AllocError::OutOfMemory {
            requested: size,
            mapped,
            limit,
        };
        if mapped.checked_add(size).is_none_or(|total| total > limit) {
            return Err(err);
        }
        let start = system::map_memory(size).ok_or(err)?;

        self.mapped.fetch_add(size, Ordering::Relaxed);
        let chunk = Chunk { start, size };
        chunks.push(chunk);
        log::debug!(
            "mapped heap chunk #{} ({} bytes at {:p})",
            chunks.len(),
            size,
            start.as_ptr()
        );
        Ok(chunk)
    }

    /// Whether `ptr` points into memory owned by this heap.
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.chunks.lock().iter().any(|chunk| chunk.contains(ptr))
    }

    pub fn stats(&self) -> HeapStats {
        let chunks = self.chunks.lock().len();
        HeapStats {
            chunks,
            mapped_bytes: self.mapped.load(Ordering::Relaxed),
            allocated_bytes: self.allocated.load(Ordering::Relaxed),
        }
    }
}

// ── Heap (Arc wrapper) ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Heap(Arc<HeapInner>);

impl Heap {
    pub fn new(settings: HeapSettings) -> Result<Self, AllocError> {
        settings.validate()?;
        Ok(Self(Arc::new(HeapInner::new(settings))))
    }

    /// The process heap, created with default settings on first use.
    pub fn global() -> &'static Heap {
        GLOBAL.get_or_init(|| Self(Arc::new(HeapInner::new(HeapSettings::default()))))
    }

    /// Install the process heap with `settings`. Has no effect (besides a
    /// warning) once the process heap exists.
    pub fn init_global(settings: HeapSettings) -> Result<&'static Heap, AllocError> {
        settings.validate()?;
        let mut installed = false;
        let heap = GLOBAL.get_or_init(|| {
            installed = true;
            Self(Arc::new(HeapInner::new(settings)))
        });
        if !installed {
            log::warn!("process heap already initialized, keeping its settings");
        }
        Ok(heap)
    }

    #[must_use]
    pub fn proxy(&self) -> HeapProxy {
        HeapProxy::new(self.clone())
    }
}

impl Deref for Heap {
    type Target = HeapInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ── Allocator ─────────────────────────────────────────────────────────

/// Narrow allocation interface used by the object layer.
///
/// Returned memory is zero-filled and aligned to at least [`HEAP_ALIGN`].
pub trait Allocator {
    fn try_allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Allocate or abort the process. Exhaustion is not recoverable.
    fn allocate(&mut self, layout: Layout) -> NonNull<u8> {
        match self.try_allocate(layout) {
            Ok(ptr) => ptr,
            Err(err) => exhausted(err),
        }
    }

    fn try_allocate_bytes(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = Layout::from_size_align(size, HEAP_ALIGN)
            .map_err(|_| AllocError::TooLarge { size })?;
        self.try_allocate(layout)
    }

    fn allocate_bytes(&mut self, size: usize) -> NonNull<u8> {
        match self.try_allocate_bytes(size) {
            Ok(ptr) => ptr,
            Err(err) => exhausted(err),
        }
    }
}

#[cold]
#[inline(never)]
fn exhausted(err: AllocError) -> ! {
    log::error!("{err}");
    std::process::abort()
}

// ── HeapProxy (per call chain allocator) ──────────────────────────────

/// Bump allocator over the tail of the chunk it currently owns.
#[derive(Debug)]
pub struct HeapProxy {
    pub heap: Heap,
    /// Bytes handed out since the last flush.
    allocated: usize,
    bump: *mut u8,
    end: *mut u8,
}

// SAFETY: the window [bump, end) belongs to this proxy alone
unsafe impl Send for HeapProxy {}

impl HeapProxy {
    #[must_use]
    pub fn new(heap: Heap) -> Self {
        Self {
            heap,
            allocated: 0,
            bump: ptr::null_mut(),
            end: ptr::null_mut(),
        }
    }

    /// Bump allocate within the current window.
    #[inline(always)]
    fn allocate_on_chunk(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let cur = self.bump as usize;
        let end = self.end as usize;

        let aligned = (cur + (align - 1)) & !(align - 1);
        let new_cur = aligned.checked_add(size)?;

        if cur == 0 || new_cur > end {
            return None;
        }
        self.bump = new_cur as *mut u8;
        self.allocated += size;
        // SAFETY: aligned is inside the window and the window is never null
        Some(unsafe { NonNull::new_unchecked(aligned as *mut u8) })
    }

    #[cold]
    #[inline(never)]
    fn allocate_slow(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        if size >= self.heap.settings.large_size {
            return self.allocate_large(size);
        }

        // the rest of the old window is abandoned
        self.flush_stats();
        let chunk = self.heap.request_chunk(size, false)?;
        self.bump = chunk.start.as_ptr();
        // SAFETY: end of the chunk we just mapped
        self.end = unsafe { chunk.start.as_ptr().add(chunk.size) };

        self.allocate_on_chunk(size, align)
            .ok_or(AllocError::TooLarge { size })
    }

    /// Large requests get a dedicated page aligned chunk and leave the
    /// current window untouched.
    fn allocate_large(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let chunk = self.heap.request_chunk(size, true)?;
        self.allocated += size;
        Ok(chunk.start)
    }

    /// Bytes handed out since the last flush.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Publish the local allocation counter to [`HeapInner::stats`].
    pub fn flush_stats(&mut self) {
        self.heap
            .allocated
            .fetch_add(self.allocated, Ordering::Relaxed);
        self.allocated = 0;
    }
}

impl Allocator for HeapProxy {
    #[inline(always)]
    fn try_allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let align = layout.align().max(HEAP_ALIGN);
        if align > OS_PAGE_SIZE {
            return Err(AllocError::TooLarge {
                size: layout.size(),
            });
        }
        // zero sized requests still get a distinct address
        let size = (layout.size().max(1) + (HEAP_ALIGN - 1)) & !(HEAP_ALIGN - 1);

        if let Some(ptr) = self.allocate_on_chunk(size, align) {
            return Ok(ptr);
        }
        self.allocate_slow(size, align)
    }
}

impl Drop for HeapProxy {
    fn drop(&mut self) {
        self.flush_stats();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
