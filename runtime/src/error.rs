use mrt_heap::AllocError;
use thiserror::Error;

/// Host-level failures. Values never carry these: inside generated code
/// errors are `Value::ERROR`.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid integer literal `{0}`")]
    InvalidInteger(String),

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    #[error(transparent)]
    Alloc(#[from] AllocError),
}
