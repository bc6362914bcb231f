//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files live in a map behind a [`RwLock`]. Writes can be switched to fail
/// on demand so callers can exercise their persistence-failure paths, and
/// reads/writes are counted so tests can assert on how often storage was hit.
///
/// # Examples
///
/// ```
/// use bestiary_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("indexes/creatures.json", b"{}")]);
/// assert!(backend.exists(Path::new("indexes/creatures.json")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation; broken test setup should not
    /// produce a passing test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            fail_writes: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent `write` and `delete` fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful or attempted `read` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `write` calls so far, including failed ones.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::BackendError(format!("writes disabled: {}", path.display())));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let data = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(data.clone())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let path = validate_path(path)?;
        self.check_writable(&path)?;
        self.storage.write().await.insert(path, data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.check_writable(&path)?;
        match self.storage.write().await.remove(&path) {
            Some(_) => Ok(()),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.write(Path::new("creatures.json"), b"{}").await.unwrap();
        assert_eq!(backend.read(Path::new("creatures.json")).await.unwrap(), b"{}");
        assert_eq!(backend.read_count(), 1);
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let backend = MockBackend::default();
        backend.fail_writes(true);
        let err = backend.write(Path::new("creatures.json"), b"{}").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BackendError(_)));
        assert!(!backend.exists(Path::new("creatures.json")).await.unwrap());
        backend.fail_writes(false);
        backend.write(Path::new("creatures.json"), b"{}").await.unwrap();
        assert!(backend.exists(Path::new("creatures.json")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let backend = MockBackend::default();
        let err = backend.delete(Path::new("creatures.json")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failing_deletes() {
        let backend = MockBackend::with_files([("indexes/creatures.json", b"{}".to_vec())]);
        backend.fail_writes(true);
        let err = backend.delete(Path::new("indexes/creatures.json")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BackendError(_)));
        assert!(backend.exists(Path::new("indexes/creatures.json")).await.unwrap());
    }
}
