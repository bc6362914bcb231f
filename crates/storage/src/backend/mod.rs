//! Storage backend trait and implementations.
//!
//! The host gives each deployment a private directory; [`StorageBackend`]
//! is the unified interface over it, with a local filesystem implementation
//! and an in-memory one for tests.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for storage backends.
///
/// Whole-file reads and overwrites only: the snapshot is small enough to be
/// written in one go, and writing it once at the end of a build is what keeps
/// readers from ever seeing a half-built index.
///
/// # Path Handling
/// All paths are relative to the deployment root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use bestiary_storage::{backend::StorageBackend, error::Result};
///
/// async fn snapshot_size(backend: &dyn StorageBackend) -> Result<usize> {
///     let path = Path::new("indexes/creatures.json");
///     if backend.exists(path).await? {
///         Ok(backend.read(path).await?.len())
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, replacing any existing file.
    ///
    /// Implementations create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;
}
