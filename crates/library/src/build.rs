//! Building, validating and serving the creature index.
//!
//! [`IndexBuilder`] owns the snapshot: it is the only writer. A build walks
//! every creature-capable pack in turn, fingerprints it from its listing,
//! runs its documents through the active system's extractor and writes one
//! new snapshot at the end. At most one build runs at a time.

use crate::error::{Error, ErrorKind, Result};
use crate::host::{HostHandle, PackInfo, creature_packs};
use bestiary_cache::{PackFingerprint, SCHEMA_VERSION, Snapshot, SnapshotStore};
use bestiary_config::IndexConfig;
use bestiary_extract::{ExtractOptions, ExtractorRegistry, IndexEntry, PackRef, SystemExtractor};
use derive_more::Display;
use exn::ResultExt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use time::UtcDateTime;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// A build running longer than this fails with
    /// [`BuildTimedOut`](ErrorKind::BuildTimedOut).
    pub deadline: Duration,
    pub extract: ExtractOptions,
}
impl Default for BuildOptions {
    fn default() -> Self {
        Self { deadline: DEFAULT_DEADLINE, extract: ExtractOptions::default() }
    }
}
impl From<&IndexConfig> for BuildOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            deadline: config.build_deadline(),
            extract: ExtractOptions { description_length: config.description_length },
        }
    }
}

/// What a build did.
///
/// Every visited document ends up either as an entry or skipped, so
/// `entries + documents_skipped == documents_visited`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub packs_total: usize,
    pub packs_indexed: usize,
    /// Packs whose listing or documents couldn't be loaded. They stay
    /// skipped until their fingerprint changes or their listing recovers.
    pub packs_skipped: usize,
    pub documents_visited: usize,
    /// Documents of a type the active system doesn't treat as a creature.
    pub documents_skipped: usize,
    pub entries: usize,
    /// Entries that are fallbacks for documents that failed to extract.
    pub extraction_errors: usize,
    /// Whether the snapshot reached storage. A build whose write failed still
    /// returns its snapshot.
    pub persisted: bool,
    pub elapsed: Duration,
}

/// A finished build.
#[derive(Debug, Clone, PartialEq)]
pub struct Build {
    pub snapshot: Snapshot,
    pub stats: BuildStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    Idle,
    Building { started_at: UtcDateTime, forced: bool },
    Failed { at: UtcDateTime, reason: String },
}
impl BuildStatus {
    fn failed(reason: impl Into<String>) -> Self {
        Self::Failed { at: UtcDateTime::now(), reason: reason.into() }
    }
}

/// Pack-level progress of the running build. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildProgress {
    /// Packs finished so far.
    pub current: usize,
    pub total: usize,
    /// Pack being processed; `None` before the first and after the last.
    pub pack_id: Option<String>,
}

/// Why a snapshot no longer reflects the host.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StaleReason {
    #[display("snapshot schema {found}, expected {expected}")]
    SchemaChanged { found: u32, expected: u32 },
    #[display("snapshot built for '{found}', active system is '{active}'")]
    SystemChanged { found: String, active: String },
    #[display("pack '{_0}' changed")]
    PackChanged(String),
    #[display("pack '{_0}' is not in the snapshot")]
    PackAdded(String),
    #[display("pack '{_0}' no longer exists")]
    PackRemoved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Stale(StaleReason),
}
impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Marks the status failed if a build is dropped (panic, cancellation)
/// before it reports an outcome.
struct StatusGuard<'a> {
    status: &'a Mutex<BuildStatus>,
}
impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*status, BuildStatus::Building { .. }) {
            *status = BuildStatus::failed("build interrupted");
        }
    }
}

struct PackIndex {
    fingerprint: PackFingerprint,
    entries: Vec<IndexEntry>,
    visited: usize,
    skipped: usize,
    errors: usize,
}

/// A pack that failed to load. `fingerprint` is set if its listing loaded.
struct PackFailure {
    fingerprint: Option<PackFingerprint>,
    error: Error,
}

pub struct IndexBuilder {
    host: HostHandle,
    store: SnapshotStore,
    registry: ExtractorRegistry,
    options: BuildOptions,
    lock: AsyncMutex<()>,
    status: Mutex<BuildStatus>,
    progress: watch::Sender<BuildProgress>,
}

impl IndexBuilder {
    pub fn new(host: HostHandle, store: SnapshotStore, registry: ExtractorRegistry, options: BuildOptions) -> Self {
        Self {
            host,
            store,
            registry,
            options,
            lock: AsyncMutex::new(()),
            status: Mutex::new(BuildStatus::Idle),
            progress: watch::Sender::new(BuildProgress::default()),
        }
    }

    pub fn host(&self) -> &HostHandle {
        &self.host
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn status(&self) -> BuildStatus {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn progress(&self) -> watch::Receiver<BuildProgress> {
        self.progress.subscribe()
    }

    fn set_status(&self, status: BuildStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// The current index: the persisted snapshot if it's still valid,
    /// otherwise a fresh (non-forced) build.
    ///
    /// An unreadable snapshot is logged and treated as missing.
    #[instrument(skip(self))]
    pub async fn get_index(&self) -> Result<Snapshot> {
        let cached = match self.store.load().await {
            Ok(cached) => cached,
            Err(err) => {
                warn!(error = %err, "unreadable snapshot, rebuilding");
                None
            },
        };
        if let Some(snapshot) = cached {
            match self.is_index_valid(&snapshot).await? {
                Validity::Valid => {
                    debug!(entries = snapshot.len(), "serving cached index");
                    return Ok(snapshot);
                },
                Validity::Stale(reason) => info!(%reason, "index is stale"),
            }
        }
        Ok(self.rebuild(false).await?.snapshot)
    }

    /// Check a snapshot against the live host without loading any
    /// document bodies.
    #[instrument(skip(self, snapshot), fields(system = snapshot.system_id(), entries = snapshot.len()))]
    pub async fn is_index_valid(&self, snapshot: &Snapshot) -> Result<Validity> {
        let metadata = &snapshot.metadata;
        if metadata.schema_version != SCHEMA_VERSION {
            return Ok(Validity::Stale(StaleReason::SchemaChanged {
                found: metadata.schema_version,
                expected: SCHEMA_VERSION,
            }));
        }
        let active = self.host.active_system();
        if metadata.system_id != active {
            return Ok(Validity::Stale(StaleReason::SystemChanged { found: metadata.system_id.clone(), active }));
        }
        let packs = creature_packs(self.host.as_ref()).await?;
        let mut known = metadata.fingerprints.keys().chain(&metadata.skipped_packs);
        if let Some(removed) = known.find(|id| !packs.iter().any(|pack| &pack.id == *id)) {
            return Ok(Validity::Stale(StaleReason::PackRemoved(removed.clone())));
        }
        for pack in &packs {
            let recorded = metadata.fingerprint(&pack.id);
            let unlisted = recorded.is_none() && metadata.is_skipped(&pack.id);
            if recorded.is_none() && !unlisted {
                return Ok(Validity::Stale(StaleReason::PackAdded(pack.id.clone())));
            }
            let live = match self.host.listing(&pack.id).await {
                Ok(listing) => fingerprint(pack, listing.len()),
                Err(err) if unlisted => {
                    debug!(pack = %pack.id, error = %err, "pack still unavailable");
                    continue;
                },
                Err(err) => {
                    warn!(pack = %pack.id, error = %err, "pack listing unavailable, treating as changed");
                    return Ok(Validity::Stale(StaleReason::PackChanged(pack.id.clone())));
                },
            };
            if !recorded.is_some_and(|recorded| recorded.matches(&live)) {
                return Ok(Validity::Stale(StaleReason::PackChanged(pack.id.clone())));
            }
        }
        Ok(Validity::Valid)
    }

    /// Build a new index and persist it.
    ///
    /// Only one build runs at a time. Without `force`, a call made while
    /// another build is running fails with
    /// [`BuildInProgress`](ErrorKind::BuildInProgress); with `force`, it
    /// waits for that build to finish and then builds again.
    #[instrument(skip(self))]
    pub async fn rebuild(&self, force: bool) -> Result<Build> {
        let _lock = if force {
            self.lock.lock().await
        } else {
            match self.lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => exn::bail!(ErrorKind::BuildInProgress),
            }
        };
        self.set_status(BuildStatus::Building { started_at: UtcDateTime::now(), forced: force });
        let _status = StatusGuard { status: &self.status };
        let deadline = self.options.deadline;
        match tokio::time::timeout(deadline, self.build()).await {
            Ok(Ok(build)) => {
                if build.stats.persisted {
                    self.set_status(BuildStatus::Idle);
                } else {
                    self.set_status(BuildStatus::failed("snapshot could not be persisted"));
                }
                Ok(build)
            },
            Ok(Err(err)) => {
                self.set_status(BuildStatus::failed(err.to_string()));
                Err(err)
            },
            Err(_) => {
                error!(deadline_secs = deadline.as_secs_f64(), "index build timed out");
                self.set_status(BuildStatus::failed("build timed out"));
                exn::bail!(ErrorKind::BuildTimedOut(deadline))
            },
        }
    }

    async fn build(&self) -> Result<Build> {
        let started = Instant::now();
        let system_id = self.host.active_system();
        let extractor = self.registry.get(&system_id).or_raise(|| ErrorKind::UnsupportedSystem(system_id.clone()))?;
        let packs = creature_packs(self.host.as_ref()).await?;
        info!(system = %system_id, packs = packs.len(), "building creature index");

        let total = packs.len();
        let mut stats = BuildStats { packs_total: total, ..BuildStats::default() };
        let mut fingerprints = Vec::with_capacity(total);
        let mut skipped_packs = Vec::new();
        let mut entries = Vec::new();
        for (current, pack) in packs.iter().enumerate() {
            self.progress.send_replace(BuildProgress { current, total, pack_id: Some(pack.id.clone()) });
            match self.index_pack(pack, extractor.as_ref()).await {
                Ok(indexed) => {
                    debug!(pack = %pack.id, entries = indexed.entries.len(), errors = indexed.errors, "pack indexed");
                    stats.packs_indexed += 1;
                    stats.documents_visited += indexed.visited;
                    stats.documents_skipped += indexed.skipped;
                    stats.extraction_errors += indexed.errors;
                    fingerprints.push(indexed.fingerprint);
                    entries.extend(indexed.entries);
                },
                Err(failure) => {
                    warn!(pack = %pack.id, error = %failure.error, "skipping pack");
                    stats.packs_skipped += 1;
                    fingerprints.extend(failure.fingerprint);
                    skipped_packs.push(pack.id.clone());
                },
            }
        }
        self.progress.send_replace(BuildProgress { current: total, total, pack_id: None });

        let snapshot = Snapshot::new(system_id, fingerprints, entries).with_skipped_packs(skipped_packs);
        stats.entries = snapshot.len();
        stats.persisted = match self.store.save(&snapshot).await {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "failed to persist creature index");
                false
            },
        };
        stats.elapsed = started.elapsed();
        info!(
            entries = stats.entries,
            skipped = stats.documents_skipped,
            errors = stats.extraction_errors,
            packs_skipped = stats.packs_skipped,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "creature index built"
        );
        Ok(Build { snapshot, stats })
    }

    async fn index_pack(
        &self,
        pack: &PackInfo,
        extractor: &dyn SystemExtractor,
    ) -> std::result::Result<PackIndex, PackFailure> {
        let listing =
            self.host.listing(&pack.id).await.map_err(|error| PackFailure { fingerprint: None, error })?;
        let fingerprint = fingerprint(pack, listing.len());
        let documents = match self.host.documents(&pack.id).await {
            Ok(documents) => documents,
            Err(error) => return Err(PackFailure { fingerprint: Some(fingerprint), error }),
        };
        let pack_ref = PackRef::new(&pack.id, &pack.label);
        let mut indexed = PackIndex { fingerprint, entries: Vec::new(), visited: 0, skipped: 0, errors: 0 };
        for (position, document) in documents.iter().enumerate() {
            indexed.visited += 1;
            if !document.document_type().is_some_and(|kind| extractor.is_eligible(kind)) {
                indexed.skipped += 1;
                continue;
            }
            let result = extractor.extract(document, pack_ref, &self.options.extract);
            let mut entry = result.entry;
            if entry.id.is_empty() {
                entry.id = format!("{}:{position}", pack.id);
            }
            indexed.errors += result.error_count as usize;
            indexed.entries.push(entry);
        }
        Ok(indexed)
    }
}

fn fingerprint(pack: &PackInfo, document_count: usize) -> PackFingerprint {
    PackFingerprint::new(&pack.id, &pack.label, document_count as u64, pack.last_modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ContentHost, MemoryHost};
    use bestiary_storage::backend::MockBackend;
    use serde_json::{Value, json};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn monster(id: &str, name: &str, cr: Value) -> Value {
        json!({ "_id": id, "name": name, "type": "npc", "system": { "details": { "cr": cr } } })
    }

    fn host() -> Arc<MemoryHost> {
        Arc::new(
            MemoryHost::new("dnd5e")
                .with_pack(PackInfo::new("world.monsters", "Monsters", "Actor"), vec![
                    monster("a", "Goblin", json!("1/4")),
                    monster("b", "Ogre", json!(2)),
                    json!({ "_id": "c", "name": "Longsword", "type": "weapon" }),
                ])
                .with_pack(PackInfo::new("world.items", "Items", "Item"), vec![json!({ "name": "Rope", "type": "loot" })]),
        )
    }

    fn builder_with(host: Arc<MemoryHost>, backend: Arc<MockBackend>, options: BuildOptions) -> IndexBuilder {
        let store = SnapshotStore::new(backend, "indexes/creatures.json");
        IndexBuilder::new(host, store, ExtractorRegistry::with_defaults(), options)
    }

    fn builder(host: Arc<MemoryHost>) -> (IndexBuilder, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::default());
        (builder_with(host, backend.clone(), BuildOptions::default()), backend)
    }

    fn ids(snapshot: &Snapshot) -> BTreeSet<String> {
        snapshot.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_build() {
        let (builder, backend) = builder(host());
        let build = builder.rebuild(false).await.unwrap();
        assert_eq!(ids(&build.snapshot), BTreeSet::from(["a".to_string(), "b".to_string()]));
        assert_eq!(build.stats.packs_total, 1);
        assert_eq!(build.stats.documents_visited, 3);
        assert_eq!(build.stats.documents_skipped, 1);
        assert_eq!(build.stats.entries + build.stats.documents_skipped, build.stats.documents_visited);
        assert!(build.stats.persisted);
        assert_eq!(backend.write_count(), 1);
        assert_eq!(build.snapshot.metadata.fingerprints.len(), 1);
        assert_eq!(builder.status(), BuildStatus::Idle);
        let progress = builder.progress().borrow().clone();
        assert_eq!(progress, BuildProgress { current: 1, total: 1, pack_id: None });
    }

    #[tokio::test]
    async fn test_valid_snapshot_loads_no_documents() {
        let host = host();
        let (builder, _) = builder(host.clone());
        builder.rebuild(false).await.unwrap();
        let loads = host.document_loads();
        let snapshot = builder.get_index().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(host.document_loads(), loads);
        assert!(builder.is_index_valid(&snapshot).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_idempotent() {
        let (builder, _) = builder(host());
        let first = builder.rebuild(false).await.unwrap();
        let second = builder.rebuild(false).await.unwrap();
        assert_eq!(ids(&first.snapshot), ids(&second.snapshot));
    }

    #[tokio::test]
    async fn test_partial_failure_contained() {
        let host = Arc::new(MemoryHost::new("dnd5e").with_pack(PackInfo::new("p", "P", "Actor"), vec![
            monster("a", "Fine", json!(1)),
            monster("b", "Broken", json!("dreadful")),
            monster("c", "Also Broken", json!({ "value": [] })),
            monster("d", "Fine Too", json!(3)),
        ]));
        let (builder, _) = builder(host);
        let build = builder.rebuild(false).await.unwrap();
        assert_eq!(build.snapshot.len(), 4);
        assert_eq!(build.stats.extraction_errors, 2);
        assert_eq!(build.snapshot.entries.iter().filter(|entry| entry.is_fallback()).count(), 2);
    }

    #[tokio::test]
    async fn test_overflowing_challenge_rating_is_cached() {
        let cr = json!(format!("{}/4", "9".repeat(400)));
        let host = Arc::new(
            MemoryHost::new("dnd5e").with_pack(PackInfo::new("p", "P", "Actor"), vec![monster("h", "Huge", cr)]),
        );
        let (builder, backend) = builder(host);
        for _ in 0..3 {
            let snapshot = builder.get_index().await.unwrap();
            assert_eq!(snapshot.entries[0].power(), Some(0.0));
            assert!(snapshot.entries[0].is_fallback());
        }
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_library() {
        let (builder, _) = builder(Arc::new(MemoryHost::new("pf2e")));
        let snapshot = builder.get_index().await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.metadata.total_entries, 0);
    }

    #[tokio::test]
    async fn test_positional_ids() {
        let host = Arc::new(MemoryHost::new("dnd5e").with_pack(PackInfo::new("p", "P", "Actor"), vec![
            json!({ "name": "Nameless One", "type": "npc" }),
        ]));
        let (builder, _) = builder(host);
        let build = builder.rebuild(false).await.unwrap();
        assert_eq!(build.snapshot.entries[0].id, "p:0");
    }

    #[tokio::test]
    async fn test_system_switch() {
        let host = host();
        let (builder, _) = builder(host.clone());
        let snapshot = builder.get_index().await.unwrap();
        host.set_system("pf2e");
        let validity = builder.is_index_valid(&snapshot).await.unwrap();
        assert!(matches!(validity, Validity::Stale(StaleReason::SystemChanged { .. })));
        let rebuilt = builder.get_index().await.unwrap();
        assert_eq!(rebuilt.system_id(), "pf2e");
        assert!(rebuilt.entries.iter().all(|entry| entry.system_id() == "pf2e"));
    }

    #[tokio::test]
    async fn test_document_count_change() {
        let host = host();
        let (builder, _) = builder(host.clone());
        let snapshot = builder.get_index().await.unwrap();
        host.push_document("world.monsters", monster("z", "Zombie", json!("1/4")));
        let validity = builder.is_index_valid(&snapshot).await.unwrap();
        assert_eq!(validity, Validity::Stale(StaleReason::PackChanged("world.monsters".to_string())));
        let loads = host.document_loads();
        let rebuilt = builder.get_index().await.unwrap();
        assert_eq!(host.document_loads(), loads + 1);
        assert!(ids(&rebuilt).contains("z"));
    }

    #[tokio::test]
    async fn test_pack_added_and_removed() {
        let host = host();
        let (builder, _) = builder(host.clone());
        let snapshot = builder.get_index().await.unwrap();
        host.add_pack(PackInfo::new("world.more", "More", "Actor"), vec![]);
        let validity = builder.is_index_valid(&snapshot).await.unwrap();
        assert_eq!(validity, Validity::Stale(StaleReason::PackAdded("world.more".to_string())));
        host.remove_pack("world.more");
        host.remove_pack("world.monsters");
        let validity = builder.is_index_valid(&snapshot).await.unwrap();
        assert_eq!(validity, Validity::Stale(StaleReason::PackRemoved("world.monsters".to_string())));
    }

    #[tokio::test]
    async fn test_failing_documents_keep_fingerprint() {
        let host = host();
        host.add_pack(PackInfo::new("world.broken", "Broken", "Actor"), vec![monster("x", "X", json!(1))]);
        host.fail_documents("world.broken");
        let (builder, _) = builder(host.clone());
        let build = builder.rebuild(false).await.unwrap();
        assert_eq!(build.stats.packs_skipped, 1);
        assert_eq!(build.stats.packs_indexed, 1);
        assert!(build.snapshot.metadata.fingerprint("world.broken").is_some());
        assert!(build.snapshot.metadata.is_skipped("world.broken"));
        assert!(builder.is_index_valid(&build.snapshot).await.unwrap().is_valid());

        host.push_document("world.broken", monster("y", "Y", json!(2)));
        let validity = builder.is_index_valid(&build.snapshot).await.unwrap();
        assert_eq!(validity, Validity::Stale(StaleReason::PackChanged("world.broken".to_string())));
    }

    #[tokio::test]
    async fn test_persistently_failing_pack_does_not_force_rebuilds() {
        let host = host();
        host.add_pack(PackInfo::new("world.broken", "Broken", "Actor"), vec![monster("x", "X", json!(1))]);
        host.add_pack(PackInfo::new("world.offline", "Offline", "Actor"), vec![monster("o", "O", json!(1))]);
        host.fail_documents("world.broken");
        host.fail_listing("world.offline");
        let (builder, backend) = builder(host.clone());
        for _ in 0..5 {
            let snapshot = builder.get_index().await.unwrap();
            assert_eq!(ids(&snapshot), BTreeSet::from(["a".to_string(), "b".to_string()]));
        }
        assert_eq!(backend.write_count(), 1);
        assert_eq!(host.document_loads(), 2);
    }

    #[tokio::test]
    async fn test_recovered_listing_is_a_change() {
        let host = host();
        host.add_pack(PackInfo::new("world.offline", "Offline", "Actor"), vec![monster("o", "O", json!(1))]);
        host.fail_listing("world.offline");
        let (builder, _) = builder(host.clone());
        let snapshot = builder.get_index().await.unwrap();
        assert!(snapshot.metadata.fingerprint("world.offline").is_none());
        assert!(snapshot.metadata.is_skipped("world.offline"));
        assert!(builder.is_index_valid(&snapshot).await.unwrap().is_valid());

        host.recover_listing("world.offline");
        let validity = builder.is_index_valid(&snapshot).await.unwrap();
        assert_eq!(validity, Validity::Stale(StaleReason::PackChanged("world.offline".to_string())));
        let rebuilt = builder.get_index().await.unwrap();
        assert!(ids(&rebuilt).contains("o"));
        assert!(!rebuilt.metadata.is_skipped("world.offline"));

        host.remove_pack("world.offline");
        host.add_pack(PackInfo::new("world.gone", "Gone", "Actor"), vec![]);
        host.fail_listing("world.gone");
        let snapshot = builder.get_index().await.unwrap();
        host.remove_pack("world.gone");
        let validity = builder.is_index_valid(&snapshot).await.unwrap();
        assert_eq!(validity, Validity::Stale(StaleReason::PackRemoved("world.gone".to_string())));
    }

    #[tokio::test]
    async fn test_unsupported_system() {
        let (builder, backend) = builder(Arc::new(MemoryHost::new("swade")));
        let err = builder.rebuild(false).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedSystem(system) if system == "swade"));
        assert_eq!(backend.write_count(), 0);
        assert!(matches!(builder.status(), BuildStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_persist_failure_still_returns_snapshot() {
        let (builder, backend) = builder(host());
        backend.fail_writes(true);
        let build = builder.rebuild(false).await.unwrap();
        assert!(!build.stats.persisted);
        assert_eq!(build.snapshot.len(), 2);
        assert!(matches!(builder.status(), BuildStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_rebuilds() {
        let backend = Arc::new(MockBackend::with_files([("indexes/creatures.json", b"garbage".to_vec())]));
        let builder = builder_with(host(), backend, BuildOptions::default());
        let snapshot = builder.get_index().await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let host = host();
        let gate = host.gate_documents();
        let (builder, _) = builder(host);
        let (first, second) = tokio::join!(builder.rebuild(false), async {
            assert!(matches!(builder.status(), BuildStatus::Building { forced: false, .. }));
            let second = builder.rebuild(false).await;
            gate.add_permits(1);
            second
        });
        assert!(first.is_ok());
        let err = second.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BuildInProgress));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_forced_rebuild_waits() {
        let host = host();
        let gate = host.gate_documents();
        let (builder, backend) = builder(host);
        let (first, second) = tokio::join!(builder.rebuild(false), async {
            let second = builder.rebuild(true);
            gate.add_permits(1);
            second.await
        });
        assert!(first.is_ok());
        assert!(second.unwrap().stats.persisted);
        assert_eq!(backend.write_count(), 2);
    }

    #[tokio::test]
    async fn test_deadline_releases_lock() {
        let host = host();
        let gate = host.gate_documents();
        let options = BuildOptions { deadline: Duration::from_millis(20), ..BuildOptions::default() };
        let builder = builder_with(host, Arc::new(MockBackend::default()), options);
        let err = builder.rebuild(false).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BuildTimedOut(_)));
        assert!(matches!(builder.status(), BuildStatus::Failed { .. }));
        gate.add_permits(1);
        assert!(builder.rebuild(false).await.is_ok());
    }

    #[tokio::test]
    async fn test_host_catalogue_failure() {
        let host = host();
        host.fail_catalogue(true);
        let (builder, _) = builder(host.clone());
        let err = builder.rebuild(false).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Host(_)));
        assert_eq!(host.active_system(), "dnd5e");
    }
}
