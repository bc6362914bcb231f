//! Fifth-edition d20 creatures: challenge rating, creature type, legendary
//! actions.

use super::{ExtractOptions, SystemExtractor, base_entry, description, number_or, size};
use crate::Document;
use crate::error::Result;
use crate::models::{IndexEntry, PackRef, SystemFields};

pub const SYSTEM_ID: &str = "dnd5e";

#[derive(Debug, Default, Clone, Copy)]
pub struct Dnd5eExtractor;

impl Dnd5eExtractor {
    fn creature_type(document: &Document) -> String {
        document
            .first::<String>(&[
                "system.details.type.value",
                "system.details.type",
                "system.details.type.custom",
                "system.details.race",
            ])
            .map(|t| t.to_lowercase())
            .unwrap_or_default()
    }

    fn has_spellcasting(document: &Document) -> bool {
        let ability = document.first::<String>(&["system.attributes.spellcasting"]).is_some();
        let level = document.first::<f64>(&["system.details.spellLevel"]).is_some_and(|level| level > 0.0);
        ability || level || document.has_item_of_type(&["spell"])
    }
}

impl SystemExtractor for Dnd5eExtractor {
    fn system_id(&self) -> &'static str {
        SYSTEM_ID
    }

    fn try_extract(&self, document: &Document, pack: PackRef<'_>, options: &ExtractOptions) -> Result<IndexEntry> {
        let challenge_rating: f64 = number_or(document, "system.details.cr", "challenge_rating", 0.0)?;
        let legendary_actions = document.first::<f64>(&["system.resources.legact.max"]).is_some_and(|max| max > 0.0);
        let system = SystemFields::Dnd5e {
            challenge_rating,
            creature_type: Self::creature_type(document),
            legendary_actions,
            hit_points: document.first(&["system.attributes.hp.max", "system.attributes.hp.value"]),
            armor_class: document.first(&["system.attributes.ac.value", "system.attributes.ac.flat"]),
            alignment: document.first::<String>(&["system.details.alignment"]).filter(|a| !a.is_empty()),
        };
        let mut entry = base_entry(document, pack, system)?;
        entry.size = size(document, &["system.traits.size"]);
        entry.has_spellcasting = Self::has_spellcasting(document);
        entry.description =
            description(document, &["system.details.biography.value", "system.details.biography.public"], options);
        Ok(entry)
    }

    fn fallback_fields(&self) -> SystemFields {
        SystemFields::Dnd5e {
            challenge_rating: 0.0,
            creature_type: String::new(),
            legendary_actions: false,
            hit_points: None,
            armor_class: None,
            alignment: None,
        }
    }
}
