//! Runtime core for compiled code: integer arithmetic over tagged words,
//! boxed integers and virtual dispatch.
//!
//! Values, instance layout and the execution context live in `mrt-object`;
//! memory comes from `mrt-heap`. Both are re-exported here so generated
//! code only links against this crate.

pub mod boxed;
pub mod builtins;
pub mod dispatch;
mod error;
pub mod format;
pub mod int;
pub mod overflow;
pub mod registry;

pub use boxed::INT_TYPE;
pub use builtins::{OBJECT_TYPE, object_init, print};
pub use dispatch::{call_virtual, invoke_virtual, runtime_type};
pub use error::RuntimeError;
pub use format::{DisplayValue, format_value};
pub use int::*;
pub use registry::TypeRegistry;

pub use mrt_heap::{AllocError, Heap, HeapCreateInfo, HeapSettings, HeapStats};
pub use mrt_object::*;
