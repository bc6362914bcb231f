use super::PackFingerprint;
use std::collections::{BTreeMap, BTreeSet};
use time::UtcDateTime;

/// Bumped whenever the shape of [`IndexEntry`](bestiary_extract::IndexEntry)
/// or the snapshot encoding changes; older snapshots are then stale.
pub const SCHEMA_VERSION: u32 = 1;

/// Describes what a snapshot was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    pub schema_version: u32,
    pub built_at: UtcDateTime,
    pub system_id: String,
    /// Keyed by pack id.
    pub fingerprints: BTreeMap<String, PackFingerprint>,
    /// Packs that contributed no entries because they failed to load. Those
    /// that could still be listed also have a fingerprint.
    pub skipped_packs: BTreeSet<String>,
    pub total_entries: usize,
}

impl IndexMetadata {
    /// Fresh metadata for a build that just finished.
    pub fn new(
        system_id: impl Into<String>,
        fingerprints: impl IntoIterator<Item = PackFingerprint>,
        total_entries: usize,
    ) -> Self {
        // Persisted with second precision.
        let now = UtcDateTime::now();
        Self {
            schema_version: SCHEMA_VERSION,
            built_at: now.replace_nanosecond(0).unwrap_or(now),
            system_id: system_id.into(),
            fingerprints: fingerprints.into_iter().map(|fp| (fp.pack_id.clone(), fp)).collect(),
            skipped_packs: BTreeSet::new(),
            total_entries,
        }
    }

    pub fn fingerprint(&self, pack_id: &str) -> Option<&PackFingerprint> {
        self.fingerprints.get(pack_id)
    }

    pub fn is_skipped(&self, pack_id: &str) -> bool {
        self.skipped_packs.contains(pack_id)
    }
}
