//! Byte-oriented storage for the creature index.
//!
//! The index persists exactly one snapshot file per deployment. This crate
//! knows nothing about snapshots; it reads, writes and deletes whole
//! files underneath a deployment-scoped root.

pub mod backend;
pub mod error;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
