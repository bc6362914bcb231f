//! Local filesystem storage backend.
//!
//! Files live under the deployment's data directory and are accessed through
//! `tokio::fs`.

use crate::error::ErrorKind;
use crate::{StorageBackend, error::Result, path::validate as validate_path};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory, which is the
/// deployment-scoped storage directory handed out by the host.
///
/// # Examples
///
/// ```no_run
/// use bestiary_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("world-data", "/srv/vtt/Data/worlds/ruins/storage")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating the root directory if
    /// it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute or points at a file.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Once per deployment; not worth making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Sibling path used to stage a write before it replaces the target.
    fn staging_path(target: &Path) -> PathBuf {
        let mut name = target.file_name().map(OsString::from).unwrap_or_default();
        name.push(".partial");
        target.with_file_name(name)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    /// Writes go to a `.partial` sibling first and are renamed into place, so
    /// a reader never observes a torn file.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        let staging = Self::staging_path(&abs_path);
        fs::write(&staging, data).await.map_err(|e| Self::map_io_error(e, path))?;
        if let Err(e) = fs::rename(&staging, &abs_path).await {
            _ = fs::remove_file(&staging).await;
            exn::bail!(Self::map_io_error(e, path));
        }
        tracing::trace!(backend = %self.name, path = %path.display(), bytes = data.len(), "File written");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("test", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("test", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("test", "relative/storage").is_err());
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("worlds/ruins/storage");
        LocalBackend::new("test", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_staging_path_is_a_sibling() {
        let staging = LocalBackend::staging_path(Path::new("/data/indexes/creatures.json"));
        assert_eq!(staging, Path::new("/data/indexes/creatures.json.partial"));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, backend) = backend();
        backend.write(Path::new("indexes/creatures.json"), b"{}").await.unwrap();
        assert_eq!(backend.read(Path::new("indexes/creatures.json")).await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_write_overwrites_and_leaves_no_staging_file() {
        let (dir, backend) = backend();
        backend.write(Path::new("creatures.json"), b"first").await.unwrap();
        backend.write(Path::new("creatures.json"), b"second").await.unwrap();
        assert_eq!(backend.read(Path::new("creatures.json")).await.unwrap(), b"second");
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|entry| entry.unwrap().file_name()).collect();
        assert_eq!(files, [OsString::from("creatures.json")]);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_dir, backend) = backend();
        let err = backend.read(Path::new("creatures.json")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, backend) = backend();
        backend.write(Path::new("creatures.json"), b"{}").await.unwrap();
        backend.delete(Path::new("creatures.json")).await.unwrap();
        assert!(!backend.exists(Path::new("creatures.json")).await.unwrap());
        let err = backend.delete(Path::new("creatures.json")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_root() {
        let (_dir, backend) = backend();
        assert!(backend.read(Path::new("../secrets.json")).await.is_err());
        assert!(backend.write(Path::new("a/../../secrets.json"), b"x").await.is_err());
        assert!(backend.delete(Path::new("../../secrets.json")).await.is_err());
    }
}
