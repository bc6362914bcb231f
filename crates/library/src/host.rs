//! The host application, as seen by the index.
//!
//! The index never talks to the host's database directly. Everything it
//! needs (the active game system, the pack catalogue, pack listings and
//! document bodies) comes through [`ContentHost`].

#[cfg(any(test, feature = "mock"))]
mod memory;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryHost;
use crate::error::Result;
use async_trait::async_trait;
use bestiary_extract::Document;
use std::sync::Arc;
use time::UtcDateTime;

/// Document kind of packs that can hold creatures.
pub const CREATURE_PACK_KIND: &str = "Actor";

/// A content pack from the host's catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackInfo {
    pub id: String,
    pub label: String,
    /// Kind of document the pack holds (`Actor`, `Item`, `JournalEntry`...).
    pub document_kind: String,
    pub last_modified: Option<UtcDateTime>,
}
impl PackInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>, document_kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            document_kind: document_kind.into(),
            last_modified: None,
        }
    }

    pub fn with_last_modified(mut self, last_modified: UtcDateTime) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn is_creature_capable(&self) -> bool {
        self.document_kind == CREATURE_PACK_KIND
    }
}

/// One row of a pack's lightweight listing: enough to count and name
/// documents without loading their bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub id: String,
    pub name: String,
    pub document_type: String,
}
impl ListingItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), document_type: document_type.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A change notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Document {
        kind: ChangeKind,
        /// `None` for world documents that live outside any pack.
        pack_id: Option<String>,
        document_type: String,
    },
    Pack {
        kind: ChangeKind,
        pack_id: String,
        document_kind: String,
    },
}

#[async_trait]
pub trait ContentHost: Send + Sync {
    /// Id of the game system the host is currently running.
    fn active_system(&self) -> String;

    /// Whether the user allows content changes to invalidate the index.
    fn auto_invalidate(&self) -> bool;

    /// Every pack in the catalogue, whatever it holds.
    async fn packs(&self) -> Result<Vec<PackInfo>>;

    /// Lightweight listing of a pack. Cheap compared to [`documents`](Self::documents).
    async fn listing(&self, pack_id: &str) -> Result<Vec<ListingItem>>;

    /// Full bodies of every document in a pack.
    async fn documents(&self, pack_id: &str) -> Result<Vec<Document>>;
}

pub type HostHandle = Arc<dyn ContentHost>;

/// Creature-capable packs, in catalogue order.
pub(crate) async fn creature_packs(host: &dyn ContentHost) -> Result<Vec<PackInfo>> {
    Ok(host.packs().await?.into_iter().filter(PackInfo::is_creature_capable).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creature_capable() {
        assert!(PackInfo::new("dnd5e.monsters", "Monsters", "Actor").is_creature_capable());
        assert!(!PackInfo::new("dnd5e.items", "Items", "Item").is_creature_capable());
        assert!(!PackInfo::new("dnd5e.rules", "Rules", "JournalEntry").is_creature_capable());
    }
}
