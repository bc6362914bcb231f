//! Dropping the snapshot when creature content changes.

use crate::error::{ErrorKind, Result};
use crate::host::{CREATURE_PACK_KIND, ChangeEvent, HostHandle};
use bestiary_cache::SnapshotStore;
use bestiary_extract::ExtractorRegistry;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::pin::pin;
use tracing::{debug, info, instrument, trace, warn};

/// Deletes the persisted snapshot on relevant host changes, so the next
/// query rebuilds it. Never touches the snapshot's contents.
pub struct InvalidationListener {
    host: HostHandle,
    store: SnapshotStore,
    registry: ExtractorRegistry,
}

impl InvalidationListener {
    pub fn new(host: HostHandle, store: SnapshotStore, registry: ExtractorRegistry) -> Self {
        Self { host, store, registry }
    }

    /// Document changes to creature-like documents, and any change to a pack
    /// that can hold creatures.
    pub fn is_relevant(&self, event: &ChangeEvent) -> bool {
        match event {
            ChangeEvent::Document { document_type, .. } => self.registry.is_creature_type(document_type),
            ChangeEvent::Pack { document_kind, .. } => document_kind == CREATURE_PACK_KIND,
        }
    }

    /// Returns `true` if a snapshot was deleted.
    #[instrument(skip(self))]
    pub async fn handle(&self, event: &ChangeEvent) -> Result<bool> {
        if !self.is_relevant(event) {
            trace!("ignoring change");
            return Ok(false);
        }
        if !self.host.auto_invalidate() {
            debug!("auto-invalidation disabled, keeping snapshot");
            return Ok(false);
        }
        let deleted = self.store.invalidate().await.or_raise(|| ErrorKind::Cache)?;
        if deleted {
            info!("creature index invalidated");
        }
        Ok(deleted)
    }

    /// Handle events until the stream ends. Returns how many of them
    /// deleted the snapshot.
    pub async fn listen(&self, events: impl Stream<Item = ChangeEvent>) -> usize {
        let mut events = pin!(events);
        let mut invalidated = 0;
        while let Some(event) = events.next().await {
            match self.handle(&event).await {
                Ok(true) => invalidated += 1,
                Ok(false) => {},
                Err(err) => warn!(error = %err, "failed to invalidate creature index"),
            }
        }
        invalidated
    }
}
