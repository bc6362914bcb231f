//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The storage backend failed to read, write or delete the snapshot.
    #[display("snapshot storage error")]
    Storage,
    /// The persisted snapshot can't be decoded, or decodes to something that
    /// breaks the snapshot's own invariants. Treat it as absent and rebuild.
    #[display("invalid snapshot data: {_0}")]
    InvalidData(#[error(not(source))] String),
    /// The snapshot could not be serialized.
    #[display("failed to encode snapshot")]
    Encode,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
