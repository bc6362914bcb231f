//! Single-file persistence of the creature index.

use crate::error::{ErrorKind, Result};
use crate::models::Snapshot;
use bestiary_storage::BackendHandle;
use exn::ResultExt;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Reads, writes and deletes the one snapshot file of a deployment.
///
/// The snapshot is always replaced whole; there's no partial update. The
/// index builder is the only writer, the invalidation listener the only
/// deleter.
#[derive(Clone)]
pub struct SnapshotStore {
    backend: BackendHandle,
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(backend: BackendHandle, path: impl Into<PathBuf>) -> Self {
        Self { backend, path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted snapshot.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet. A snapshot that
    /// exists but can't be read or decoded is an error; callers decide
    /// whether that means "rebuild".
    #[instrument(skip(self), fields(backend = self.backend.name(), path = %self.path.display()))]
    pub async fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = match self.backend.read(&self.path).await {
            Err(err) if err.is_not_found() => {
                debug!("no snapshot persisted");
                return Ok(None);
            },
            result => result.or_raise(|| ErrorKind::Storage)?,
        };
        let snapshot = Snapshot::decode(&bytes)?;
        debug!(entries = snapshot.len(), system = snapshot.system_id(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Replace the persisted snapshot.
    #[instrument(skip(self, snapshot), fields(backend = self.backend.name(), path = %self.path.display(), entries = snapshot.len()))]
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = snapshot.encode()?;
        self.backend.write(&self.path, &bytes).await.or_raise(|| ErrorKind::Storage)?;
        info!(bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    /// Delete the persisted snapshot. Returns `false` if there was none.
    #[instrument(skip(self), fields(backend = self.backend.name(), path = %self.path.display()))]
    pub async fn invalidate(&self) -> Result<bool> {
        match self.backend.delete(&self.path).await {
            Err(err) if err.is_not_found() => Ok(false),
            result => {
                result.or_raise(|| ErrorKind::Storage)?;
                info!("snapshot invalidated");
                Ok(true)
            },
        }
    }
}

impl fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("backend", &self.backend.name())
            .field("path", &self.path)
            .finish()
    }
}
