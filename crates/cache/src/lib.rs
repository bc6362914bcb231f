//! Persisted creature index snapshots.
//!
//! The index is an eventually-consistent read cache over the host's content
//! packs. It is persisted as a single [`Snapshot`] per deployment, stamped
//! with [`PackFingerprint`]s describing the packs it was built from so
//! staleness can be detected without re-reading any documents. Deleting the
//! snapshot is always safe: the next query rebuilds it.

pub mod error;
mod models;
mod store;

pub use crate::models::{IndexMetadata, PackFingerprint, SCHEMA_VERSION, Snapshot};
pub use crate::store::SnapshotStore;
