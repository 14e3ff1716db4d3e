mod error;
mod heap;
mod system;

pub use error::AllocError;
pub use heap::*;
pub use system::{OS_PAGE_SIZE, map_memory, page_align};
