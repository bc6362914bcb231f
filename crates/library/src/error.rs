//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::time::Duration;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No extractor is registered for the active game system. Nothing was
    /// built or persisted.
    #[display("unsupported game system: {_0}")]
    UnsupportedSystem(#[error(not(source))] String),
    /// Another build holds the build lock.
    #[display("an index build is already in progress")]
    BuildInProgress,
    /// The build ran past its deadline and was abandoned.
    #[display("index build exceeded its deadline of {}s", _0.as_secs_f64())]
    BuildTimedOut(#[error(not(source))] Duration),
    /// The host couldn't enumerate packs or load their contents.
    #[display("content host error: {_0}")]
    Host(#[error(not(source))] String),
    /// Reading or deleting the persisted snapshot failed.
    #[display("snapshot cache error")]
    Cache,
    /// Storage or configuration couldn't be set up.
    #[display("failed to initialize the creature index")]
    Setup,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BuildInProgress | Self::BuildTimedOut(_) | Self::Host(_) | Self::Cache)
    }
}
