//! Serialized shape of a snapshot.
//!
//! The snapshot is stored through a settings-style store that only
//! round-trips scalars, arrays and flat records, so the fingerprint map is
//! written as an array of `[pack_id, fingerprint]` pairs and rebuilt (and
//! checked for duplicate keys) on the way back in.

use super::{IndexMetadata, PackFingerprint};
use crate::error::{Error, ErrorKind};
use bestiary_extract::IndexEntry;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use time::UtcDateTime;

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct SnapshotProxy<'a> {
    #[serde(rename = "meta")]
    pub metadata: MetadataProxy,
    pub entries: Cow<'a, [IndexEntry]>,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetadataProxy {
    pub schema_version: u32,
    /// Unix seconds.
    pub built_at: i64,
    pub system_id: String,
    pub fingerprints: FingerprintPairs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_packs: Vec<String>,
    pub total_entries: usize,
}
impl From<&IndexMetadata> for MetadataProxy {
    fn from(metadata: &IndexMetadata) -> Self {
        Self {
            schema_version: metadata.schema_version,
            built_at: metadata.built_at.unix_timestamp(),
            system_id: metadata.system_id.clone(),
            fingerprints: (&metadata.fingerprints).into(),
            skipped_packs: metadata.skipped_packs.iter().cloned().collect(),
            total_entries: metadata.total_entries,
        }
    }
}
impl TryFrom<MetadataProxy> for IndexMetadata {
    type Error = Error;

    fn try_from(proxy: MetadataProxy) -> Result<Self, Self::Error> {
        Ok(Self {
            schema_version: proxy.schema_version,
            built_at: timestamp(proxy.built_at)?,
            system_id: proxy.system_id,
            fingerprints: proxy.fingerprints.try_into()?,
            skipped_packs: proxy.skipped_packs.into_iter().collect(),
            total_entries: proxy.total_entries,
        })
    }
}

/// A map flattened into `[key, value]` pairs.
#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[serde(transparent)]
pub(crate) struct FingerprintPairs(pub Vec<(String, FingerprintProxy)>);
impl From<&BTreeMap<String, PackFingerprint>> for FingerprintPairs {
    fn from(map: &BTreeMap<String, PackFingerprint>) -> Self {
        Self(map.iter().map(|(pack_id, fingerprint)| (pack_id.clone(), fingerprint.into())).collect())
    }
}
impl TryFrom<FingerprintPairs> for BTreeMap<String, PackFingerprint> {
    type Error = Error;

    fn try_from(pairs: FingerprintPairs) -> Result<Self, Self::Error> {
        let mut map = BTreeMap::new();
        for (pack_id, proxy) in pairs.0 {
            match map.entry(pack_id) {
                Entry::Occupied(occupied) => {
                    exn::bail!(ErrorKind::InvalidData(format!("duplicate pack key '{}'", occupied.key())))
                },
                Entry::Vacant(vacant) => {
                    let fingerprint = PackFingerprint {
                        pack_id: vacant.key().clone(),
                        pack_label: proxy.label,
                        last_modified: proxy.modified.map(timestamp).transpose()?,
                        document_count: proxy.count,
                        checksum: proxy.checksum,
                    };
                    vacant.insert(fingerprint);
                },
            }
        }
        Ok(map)
    }
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct FingerprintProxy {
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified: Option<i64>,
    count: u64,
    checksum: String,
}
impl From<&PackFingerprint> for FingerprintProxy {
    fn from(fingerprint: &PackFingerprint) -> Self {
        Self {
            label: fingerprint.pack_label.clone(),
            modified: fingerprint.last_modified.map(UtcDateTime::unix_timestamp),
            count: fingerprint.document_count,
            checksum: fingerprint.checksum.clone(),
        }
    }
}

fn timestamp(seconds: i64) -> Result<UtcDateTime, Error> {
    UtcDateTime::from_unix_timestamp(seconds).or_raise(|| ErrorKind::InvalidData(format!("timestamp {seconds}")))
}
