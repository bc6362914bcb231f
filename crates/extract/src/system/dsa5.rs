//! The Dark Eye (5th edition) characters and creatures.
//!
//! DSA5 has no creature power rating. Characters carry adventure points
//! (AP), which map onto the seven published experience levels; an explicit
//! `status.level` wins when present.

use super::{ExtractOptions, SystemExtractor, base_entry, description, size};
use crate::Document;
use crate::error::Result;
use crate::models::{IndexEntry, PackRef, SystemFields};

pub const SYSTEM_ID: &str = "dsa5";

/// Starting AP of each experience level, from "inexperienced" to "legendary".
const EXPERIENCE_THRESHOLDS: [f64; 7] = [900.0, 1000.0, 1100.0, 1200.0, 1400.0, 1700.0, 2100.0];

/// Experience level for a total of adventure points.
fn experience_level(total_ap: f64) -> i32 {
    EXPERIENCE_THRESHOLDS.iter().filter(|threshold| **threshold <= total_ap).count() as i32
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Dsa5Extractor;

impl Dsa5Extractor {
    fn level(document: &Document) -> Option<i32> {
        document
            .first::<i32>(&["system.status.level"])
            .or_else(|| document.first::<f64>(&["system.details.experience.total"]).map(experience_level))
    }

    fn has_spellcasting(document: &Document) -> bool {
        document
            .first::<f64>(&["system.status.astralenergy.max"])
            .into_iter()
            .chain(document.first::<f64>(&["system.status.karmaenergy.max"]))
            .any(|pool| pool > 0.0)
    }
}

impl SystemExtractor for Dsa5Extractor {
    fn system_id(&self) -> &'static str {
        SYSTEM_ID
    }

    fn try_extract(&self, document: &Document, pack: PackRef<'_>, options: &ExtractOptions) -> Result<IndexEntry> {
        let system = SystemFields::Dsa5 {
            level: Self::level(document),
            species: document.first(&["system.details.species.value", "system.details.species"]),
            culture: document.first(&["system.details.culture.value", "system.details.culture"]),
            profession: document.first(&["system.details.career.value", "system.details.career"]),
            hit_points: document.first(&["system.status.wounds.max", "system.status.wounds.value"]),
        };
        let mut entry = base_entry(document, pack, system)?;
        entry.size = size(document, &["system.status.size.value", "system.status.size"]);
        entry.has_spellcasting = Self::has_spellcasting(document);
        entry.description = description(
            document,
            &["system.details.biography.value", "system.description.value", "system.description"],
            options,
        );
        Ok(entry)
    }

    fn fallback_fields(&self) -> SystemFields {
        SystemFields::Dsa5 {
            level: None,
            species: None,
            culture: None,
            profession: None,
            hit_points: None,
        }
    }
}
