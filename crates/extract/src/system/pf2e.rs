//! Trait-based d20 creatures: signed level, trait list, rarity.

use super::{ExtractOptions, SystemExtractor, base_entry, description, normalize_labels, number_or, size};
use crate::Document;
use crate::error::Result;
use crate::models::{IndexEntry, PackRef, SystemFields};

pub const SYSTEM_ID: &str = "pf2e";
const DEFAULT_RARITY: &str = "common";

#[derive(Debug, Default, Clone, Copy)]
pub struct Pf2eExtractor;

impl SystemExtractor for Pf2eExtractor {
    fn system_id(&self) -> &'static str {
        SYSTEM_ID
    }

    fn try_extract(&self, document: &Document, pack: PackRef<'_>, options: &ExtractOptions) -> Result<IndexEntry> {
        // `details.level` is `{ "value": n }` on current data and a bare
        // number on older exports; coercion unwraps both.
        let level: i32 = number_or(document, "system.details.level", "level", 0)?;
        let traits = document.first::<Vec<String>>(&["system.traits.value"]).unwrap_or_default();
        let rarity = document
            .first::<String>(&["system.traits.rarity"])
            .map(|r| r.to_lowercase())
            .unwrap_or_else(|| DEFAULT_RARITY.to_string());
        let system = SystemFields::Pf2e {
            level,
            traits: normalize_labels(traits),
            rarity: Some(rarity),
            hit_points: document.first(&["system.attributes.hp.max", "system.attributes.hp.value"]),
            armor_class: document.first(&["system.attributes.ac.value"]),
        };
        let mut entry = base_entry(document, pack, system)?;
        entry.size = size(document, &["system.traits.size.value", "system.traits.size"]);
        entry.has_spellcasting = document.has_item_of_type(&["spellcastingEntry", "spell"]);
        entry.description = description(
            document,
            &["system.details.publicNotes", "system.details.biography.appearance", "system.details.blurb"],
            options,
        );
        Ok(entry)
    }

    fn fallback_fields(&self) -> SystemFields {
        SystemFields::Pf2e {
            level: 0,
            traits: Vec::new(),
            rarity: None,
            hit_points: None,
            armor_class: None,
        }
    }
}
