//! Error types shared by the buffer controller, its entries and configuration.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BufferError>;

#[derive(Debug, Error)]
pub enum BufferError {
    /// An entry whose array length differs from the controller capacity.
    #[error("entry length {actual} does not match buffer capacity {expected}")]
    CapacityMismatch { expected: usize, actual: usize },
    #[error("variable {full_name} has already been added to this buffer")]
    DuplicateVariable { full_name: String },
    #[error("invalid range [{start}, {end}] for buffer of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },
    #[error("thinning stride must be at least 1, got {stride}")]
    InvalidStride { stride: usize },
    #[error("name {name} matches {matches} entries; include more of the namespace")]
    AmbiguousName { name: String, matches: usize },
    #[error("name {name} must not contain a '.' here")]
    InvalidName { name: String },
    #[error("no entry for variable {name}")]
    UnknownVariable { name: String },
    #[error("cursor is locked")]
    CursorLocked,
    #[error("invalid buffer configuration: {reason}")]
    InvalidConfig { reason: String },
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}
