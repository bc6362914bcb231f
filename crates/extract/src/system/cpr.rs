//! Cyberpunk RED: characters, mooks, vehicles, demons and ICE.
//!
//! There is no power rating in this system; entries are classified by a
//! keyword list built from roles, ICE class and vehicle type.

use super::{ExtractOptions, SystemExtractor, base_entry, description, normalize_labels, size};
use crate::Document;
use crate::error::Result;
use crate::models::{IndexEntry, PackRef, SystemFields};

pub const SYSTEM_ID: &str = "cyberpunk-red-core";

const ELIGIBLE_TYPES: &[&str] = &["character", "npc", "creature", "mook", "vehicle", "ice", "blackIce", "demon"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CprExtractor;

impl CprExtractor {
    fn keywords(document: &Document) -> Vec<String> {
        let roles = document.first::<Vec<String>>(&["system.roleInfo.roles"]).unwrap_or_default();
        let class = document.first::<String>(&["system.class"]);
        let vehicle = document.first::<String>(&["system.vehicleType", "system.type"]);
        normalize_labels(roles.into_iter().chain(class).chain(vehicle))
    }
}

impl SystemExtractor for CprExtractor {
    fn system_id(&self) -> &'static str {
        SYSTEM_ID
    }

    fn eligible_types(&self) -> &'static [&'static str] {
        ELIGIBLE_TYPES
    }

    fn try_extract(&self, document: &Document, pack: PackRef<'_>, options: &ExtractOptions) -> Result<IndexEntry> {
        let system = SystemFields::Cpr {
            keywords: Self::keywords(document),
            hit_points: document.first(&["system.derivedStats.hp.max", "system.stats.rez.max"]),
            armor_class: document.first(&["system.externalData.currentArmorBody.value"]),
        };
        let mut entry = base_entry(document, pack, system)?;
        entry.size = size(document, &["system.size"]);
        entry.description = description(document, &["system.information.notes", "system.description.value"], options);
        Ok(entry)
    }

    fn fallback_fields(&self) -> SystemFields {
        SystemFields::Cpr {
            keywords: Vec::new(),
            hit_points: None,
            armor_class: None,
        }
    }
}
