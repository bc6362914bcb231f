use super::proxy::{MetadataProxy, SnapshotProxy};
use super::{IndexMetadata, PackFingerprint};
use crate::error::{ErrorKind, Result};
use bestiary_extract::IndexEntry;
use exn::ResultExt;
use std::borrow::Cow;

/// The persisted creature index: every entry plus what it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub metadata: IndexMetadata,
    pub entries: Vec<IndexEntry>,
}

impl Snapshot {
    pub fn new(
        system_id: impl Into<String>,
        fingerprints: impl IntoIterator<Item = PackFingerprint>,
        entries: Vec<IndexEntry>,
    ) -> Self {
        Self {
            metadata: IndexMetadata::new(system_id, fingerprints, entries.len()),
            entries,
        }
    }

    /// Record packs that failed to load during the build.
    pub fn with_skipped_packs(mut self, pack_ids: impl IntoIterator<Item = String>) -> Self {
        self.metadata.skipped_packs = pack_ids.into_iter().collect();
        self
    }

    pub fn system_id(&self) -> &str {
        &self.metadata.system_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.check()?;
        let proxy = SnapshotProxy {
            metadata: MetadataProxy::from(&self.metadata),
            entries: Cow::Borrowed(&self.entries),
        };
        serde_json::to_vec(&proxy).or_raise(|| ErrorKind::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let proxy: SnapshotProxy<'static> =
            serde_json::from_slice(bytes).or_raise(|| ErrorKind::InvalidData("malformed snapshot".to_string()))?;
        let snapshot = Self {
            metadata: proxy.metadata.try_into()?,
            entries: proxy.entries.into_owned(),
        };
        snapshot.check()?;
        Ok(snapshot)
    }

    /// A snapshot holds entries of exactly one game system (the one in its
    /// metadata) and knows how many. Power values must survive JSON.
    fn check(&self) -> Result<()> {
        if self.metadata.total_entries != self.entries.len() {
            exn::bail!(ErrorKind::InvalidData(format!(
                "snapshot claims {} entries but holds {}",
                self.metadata.total_entries,
                self.entries.len()
            )));
        }
        if let Some(stray) = self.entries.iter().find(|entry| entry.system_id() != self.metadata.system_id) {
            exn::bail!(ErrorKind::InvalidData(format!(
                "entry '{}' belongs to '{}', snapshot is for '{}'",
                stray.id,
                stray.system_id(),
                self.metadata.system_id
            )));
        }
        if let Some(stray) = self.entries.iter().find(|entry| entry.power().is_some_and(|power| !power.is_finite())) {
            exn::bail!(ErrorKind::InvalidData(format!("entry '{}' has a non-finite power", stray.id)));
        }
        Ok(())
    }
}
