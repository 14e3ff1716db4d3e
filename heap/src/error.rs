use thiserror::Error;

/// Reasons the process heap can refuse an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("invalid heap settings: {0}")]
    InvalidSettings(&'static str),

    /// The request cannot be expressed as a word aligned layout.
    #[error("allocation of {size} bytes exceeds the addressable heap")]
    TooLarge { size: usize },

    /// Mapping another chunk would exceed `HeapSettings::max_size`, or the
    /// operating system refused the mapping.
    #[error("heap exhausted: {requested} bytes requested, {mapped} of {limit} bytes mapped")]
    OutOfMemory {
        requested: usize,
        mapped: usize,
        limit: usize,
    },
}
