//! The creature index: build, validate, invalidate and query a cached,
//! normalized view of every creature in the host's content packs.
//!
//! [`CreatureIndex`] wires the pieces together from a [`Config`]:
//!
//! - [`IndexBuilder`] owns the persisted snapshot and rebuilds it when the
//!   packs' fingerprints no longer match,
//! - [`InvalidationListener`] deletes the snapshot when creature content
//!   changes,
//! - [`QueryEngine`] filters the index for encounter building, falling back
//!   to a name scan of pack listings when no index can be built.

pub mod build;
pub mod error;
pub mod host;
pub mod invalidate;
pub mod query;

pub use crate::build::{Build, BuildOptions, BuildProgress, BuildStats, BuildStatus, IndexBuilder, StaleReason, Validity};
pub use crate::host::{ChangeEvent, ChangeKind, ContentHost, HostHandle, ListingItem, PackInfo};
pub use crate::invalidate::InvalidationListener;
pub use crate::query::{Criteria, Matches, PowerFilter, QueryEngine, QueryOptions, QueryResult, Summary};
use crate::error::{ErrorKind, Result};
use bestiary_cache::{Snapshot, SnapshotStore};
use bestiary_config::Config;
use bestiary_extract::ExtractorRegistry;
use bestiary_storage::BackendHandle;
use bestiary_storage::backend::LocalBackend;
use exn::ResultExt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub struct CreatureIndex {
    builder: Arc<IndexBuilder>,
    engine: QueryEngine,
    listener: InvalidationListener,
}

impl CreatureIndex {
    /// Index persisted on the local filesystem under the configured storage
    /// root.
    pub fn from_config(host: HostHandle, config: &Config) -> Result<Self> {
        let root = config.storage.root().or_raise(|| ErrorKind::Setup)?;
        let backend = LocalBackend::new("local", &root).or_raise(|| ErrorKind::Setup)?;
        info!(root = %root.display(), "creature index storage ready");
        Ok(Self::new(host, Arc::new(backend), ExtractorRegistry::with_defaults(), config))
    }

    pub fn new(host: HostHandle, backend: BackendHandle, registry: ExtractorRegistry, config: &Config) -> Self {
        let store = SnapshotStore::new(backend, &config.index.snapshot_path);
        let listener = InvalidationListener::new(host.clone(), store.clone(), registry.clone());
        let builder = Arc::new(IndexBuilder::new(host, store, registry, BuildOptions::from(&config.index)));
        let engine = QueryEngine::new(builder.clone(), QueryOptions::from(&config.query));
        Self { builder, engine, listener }
    }

    pub async fn query(&self, criteria: &Criteria) -> Result<QueryResult> {
        self.engine.query(criteria).await
    }

    pub async fn get_index(&self) -> Result<Snapshot> {
        self.builder.get_index().await
    }

    pub async fn rebuild(&self, force: bool) -> Result<Build> {
        self.builder.rebuild(force).await
    }

    pub fn status(&self) -> BuildStatus {
        self.builder.status()
    }

    pub fn progress(&self) -> watch::Receiver<BuildProgress> {
        self.builder.progress()
    }

    pub fn builder(&self) -> &Arc<IndexBuilder> {
        &self.builder
    }

    pub fn listener(&self) -> &InvalidationListener {
        &self.listener
    }
}
