use mrt_heap::{AllocError, Allocator, Heap, HeapProxy};

use crate::Value;

/// Called when a method is dispatched on `Value::NONE`. The return value
/// stands in for the method's result if the hook returns at all.
pub type AbortFn = fn(&mut Env) -> Value;

/// Default [`AbortFn`]: log and terminate the process.
pub fn default_abort(env: &mut Env) -> Value {
    log::error!(
        "method dispatched on None (frame {}, stack top {})",
        env.frame(),
        env.stack_top()
    );
    std::process::abort()
}

#[derive(Debug, Clone)]
pub struct EnvCreateInfo {
    /// Initial capacity of the evaluation stack, in words.
    pub stack_size: usize,
    pub abort: AbortFn,
}

impl Default for EnvCreateInfo {
    fn default() -> Self {
        Self {
            stack_size: 1024,
            abort: default_abort,
        }
    }
}

/// Frame and stack position to restore when a call returns.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub struct SavedFrame {
    frame: usize,
    stack_top: usize,
}

/// Execution context of one call chain.
///
/// Every runtime operation and every compiled function takes `&mut Env`.
/// The evaluation stack holds the frames of the chain: `frame` is the index
/// of local 0 of the active call, `stack_top` the number of words in use.
/// Both are meaningless outside the chain that owns this `Env`, which is
/// why it is neither `Clone` nor `Sync`.
#[derive(Debug)]
pub struct Env {
    heap: HeapProxy,
    stack: Vec<Value>,
    frame: usize,
    abort: AbortFn,
}

impl Env {
    pub fn new(heap: &Heap, info: &EnvCreateInfo) -> Self {
        Self {
            heap: heap.proxy(),
            stack: Vec::with_capacity(info.stack_size),
            frame: 0,
            abort: info.abort,
        }
    }

    // ── Frames ─────────────────────────────────────────────────────

    /// Index of local 0 of the active frame.
    #[inline(always)]
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Number of stack words in use.
    #[inline(always)]
    pub fn stack_top(&self) -> usize {
        self.stack.len()
    }

    /// Open a frame whose first locals are `args`. The callee sees them as
    /// `local(0)..local(args.len())`.
    pub fn enter_frame(&mut self, args: &[Value]) -> SavedFrame {
        let saved = SavedFrame {
            frame: self.frame,
            stack_top: self.stack.len(),
        };
        self.frame = saved.stack_top;
        self.stack.extend_from_slice(args);
        saved
    }

    /// Drop the active frame and everything pushed above it.
    pub fn leave_frame(&mut self, saved: SavedFrame) {
        debug_assert!(saved.stack_top <= self.stack.len(), "frame already left");
        self.stack.truncate(saved.stack_top);
        self.frame = saved.frame;
    }

    /// Run `f` in a fresh frame holding `args` and return its result.
    pub fn call(&mut self, args: &[Value], f: impl FnOnce(&mut Env) -> Value) -> Value {
        let saved = self.enter_frame(args);
        let result = f(self);
        self.leave_frame(saved);
        result
    }

    /// Number of words in the active frame, temporaries included.
    #[inline(always)]
    pub fn frame_len(&self) -> usize {
        self.stack.len() - self.frame
    }

    #[inline(always)]
    pub fn local(&self, index: usize) -> Value {
        debug_assert!(index < self.frame_len(), "local {index} out of frame");
        self.stack[self.frame + index]
    }

    #[inline(always)]
    pub fn set_local(&mut self, index: usize, value: Value) {
        debug_assert!(index < self.frame_len(), "local {index} out of frame");
        self.stack[self.frame + index] = value;
    }

    // ── Evaluation stack ───────────────────────────────────────────

    #[inline(always)]
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop the top word of the active frame. Popping an empty frame is a
    /// code generator bug and yields `Value::ERROR`.
    #[inline(always)]
    pub fn pop(&mut self) -> Value {
        if self.stack.len() <= self.frame {
            debug_assert!(false, "pop below frame base");
            return Value::ERROR;
        }
        self.stack.pop().unwrap_or(Value::ERROR)
    }

    // ── Allocation ─────────────────────────────────────────────────

    /// Allocate `size` zeroed bytes that are never freed and return them as
    /// a tagged reference. Aborts the process when the heap is exhausted.
    #[inline]
    pub fn allocate(&mut self, size: usize) -> Value {
        let ptr = self.heap.allocate_bytes(size);
        Value::from_ptr(ptr.as_ptr())
    }

    pub fn try_allocate(&mut self, size: usize) -> Result<Value, AllocError> {
        let ptr = self.heap.try_allocate_bytes(size)?;
        Ok(Value::from_ptr(ptr.as_ptr()))
    }

    pub fn heap(&mut self) -> &mut HeapProxy {
        &mut self.heap
    }

    // ── Faults ─────────────────────────────────────────────────────

    pub fn set_abort(&mut self, abort: AbortFn) {
        self.abort = abort;
    }

    /// Route to the configured abort hook.
    #[cold]
    pub fn abort(&mut self) -> Value {
        (self.abort)(self)
    }
}

impl Default for Env {
    /// A context allocating from the process heap.
    fn default() -> Self {
        Self::new(Heap::global(), &EnvCreateInfo::default())
    }
}
