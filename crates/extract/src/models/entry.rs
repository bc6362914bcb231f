use super::Size;

/// Identifies the content pack a document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackRef<'a> {
    pub id: &'a str,
    pub label: &'a str,
}
impl<'a> PackRef<'a> {
    pub fn new(id: &'a str, label: &'a str) -> Self {
        Self { id, label }
    }
}

/// One normalized row of the creature index.
///
/// Common fields are shared by every game system; everything that only makes
/// sense for one ruleset lives in [`SystemFields`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct IndexEntry {
    /// Stable document id within its pack
    pub id: String,
    pub pack_id: String,
    pub pack_label: String,
    pub name: String,
    /// The host's document type (`npc`, `character`, `vehicle`...)
    pub kind: String,
    pub size: Size,
    pub has_spellcasting: bool,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub has_image: Option<bool>,
    /// Plain-text description, truncated
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    /// Set on the placeholder produced when extraction failed
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "std::ops::Not::not"))]
    pub extraction_failed: bool,
    pub system: SystemFields,
}

/// Ruleset-specific part of an [`IndexEntry`].
///
/// Closed on purpose: a snapshot holds entries of exactly one variant, and
/// the variant is how a decoded snapshot proves that.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "id"))]
pub enum SystemFields {
    #[cfg_attr(feature = "serde", serde(rename = "dnd5e", rename_all = "camelCase"))]
    Dnd5e {
        challenge_rating: f64,
        creature_type: String,
        legendary_actions: bool,
        hit_points: Option<u32>,
        armor_class: Option<u32>,
        alignment: Option<String>,
    },
    #[cfg_attr(feature = "serde", serde(rename = "pf2e", rename_all = "camelCase"))]
    Pf2e {
        /// Creature level; `-1` is a real level in this system
        level: i32,
        traits: Vec<String>,
        rarity: Option<String>,
        hit_points: Option<u32>,
        armor_class: Option<u32>,
    },
    #[cfg_attr(feature = "serde", serde(rename = "dsa5", rename_all = "camelCase"))]
    Dsa5 {
        /// Experience tier, only known for player-character-like documents
        level: Option<i32>,
        species: Option<String>,
        culture: Option<String>,
        profession: Option<String>,
        hit_points: Option<u32>,
    },
    #[cfg_attr(feature = "serde", serde(rename = "cyberpunk-red-core", rename_all = "camelCase"))]
    Cpr {
        keywords: Vec<String>,
        hit_points: Option<u32>,
        armor_class: Option<u32>,
    },
}
impl SystemFields {
    /// Game-system id this variant belongs to.
    pub fn system_id(&self) -> &'static str {
        match self {
            Self::Dnd5e { .. } => crate::system::dnd5e::SYSTEM_ID,
            Self::Pf2e { .. } => crate::system::pf2e::SYSTEM_ID,
            Self::Dsa5 { .. } => crate::system::dsa5::SYSTEM_ID,
            Self::Cpr { .. } => crate::system::cpr::SYSTEM_ID,
        }
    }
}

impl IndexEntry {
    /// The scalar used to rank creatures for encounter building: challenge
    /// rating or level, depending on the system. Some systems have none.
    pub fn power(&self) -> Option<f64> {
        match &self.system {
            SystemFields::Dnd5e { challenge_rating, .. } => Some(*challenge_rating),
            SystemFields::Pf2e { level, .. } => Some(f64::from(*level)),
            SystemFields::Dsa5 { level, .. } => level.map(f64::from),
            SystemFields::Cpr { .. } => None,
        }
    }

    /// Type classification as a set of labels.
    ///
    /// A single creature type for d20-style systems, the trait list for
    /// trait-based systems, species/culture/profession for DSA5 and the
    /// keyword list for cyberpunk.
    pub fn traits(&self) -> Vec<&str> {
        let labels: Vec<&str> = match &self.system {
            SystemFields::Dnd5e { creature_type, .. } => vec![creature_type.as_str()],
            SystemFields::Pf2e { traits, .. } => traits.iter().map(String::as_str).collect(),
            SystemFields::Dsa5 { species, culture, profession, .. } => {
                [species, culture, profession].into_iter().flatten().map(String::as_str).collect()
            },
            SystemFields::Cpr { keywords, .. } => keywords.iter().map(String::as_str).collect(),
        };
        labels.into_iter().filter(|label| !label.is_empty()).collect()
    }

    pub fn rarity(&self) -> Option<&str> {
        match &self.system {
            SystemFields::Pf2e { rarity, .. } => rarity.as_deref(),
            _ => None,
        }
    }

    pub fn legendary_actions(&self) -> bool {
        matches!(self.system, SystemFields::Dnd5e { legendary_actions: true, .. })
    }

    pub fn hit_points(&self) -> Option<u32> {
        match &self.system {
            SystemFields::Dnd5e { hit_points, .. }
            | SystemFields::Pf2e { hit_points, .. }
            | SystemFields::Dsa5 { hit_points, .. }
            | SystemFields::Cpr { hit_points, .. } => *hit_points,
        }
    }

    pub fn armor_class(&self) -> Option<u32> {
        match &self.system {
            SystemFields::Dnd5e { armor_class, .. }
            | SystemFields::Pf2e { armor_class, .. }
            | SystemFields::Cpr { armor_class, .. } => *armor_class,
            SystemFields::Dsa5 { .. } => None,
        }
    }

    pub fn system_id(&self) -> &'static str {
        self.system.system_id()
    }

    /// Whether this entry came out of a failed extraction.
    pub fn is_fallback(&self) -> bool {
        self.extraction_failed
    }
}

/// Outcome of extracting one document. Transient: folded into build totals
/// and dropped once the entry is in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub entry: IndexEntry,
    /// `1` if the entry is a fallback produced after a failed extraction.
    pub error_count: u32,
}
impl ExtractionResult {
    pub fn ok(entry: IndexEntry) -> Self {
        Self { entry, error_count: 0 }
    }

    pub fn failed(entry: IndexEntry) -> Self {
        Self { entry, error_count: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn entry(system: SystemFields) -> IndexEntry {
        IndexEntry {
            id: "a1".to_string(),
            pack_id: "world.monsters".to_string(),
            pack_label: "Monsters".to_string(),
            name: "Thing".to_string(),
            kind: "npc".to_string(),
            size: Size::Medium,
            has_spellcasting: false,
            has_image: None,
            description: None,
            extraction_failed: false,
            system,
        }
    }

    #[test]
    fn test_power_per_system() {
        let dnd = entry(SystemFields::Dnd5e {
            challenge_rating: 0.5,
            creature_type: "beast".to_string(),
            legendary_actions: false,
            hit_points: None,
            armor_class: None,
            alignment: None,
        });
        assert_eq!(dnd.power(), Some(0.5));
        let pf = entry(SystemFields::Pf2e {
            level: -1,
            traits: vec![],
            rarity: None,
            hit_points: None,
            armor_class: None,
        });
        assert_eq!(pf.power(), Some(-1.0));
        let cpr = entry(SystemFields::Cpr {
            keywords: vec!["solo".to_string()],
            hit_points: Some(40),
            armor_class: Some(11),
        });
        assert_eq!(cpr.power(), None);
        assert_eq!(cpr.traits(), vec!["solo"]);
        assert_eq!(cpr.armor_class(), Some(11));
    }

    #[test]
    fn test_traits_skip_blank_labels() {
        let dnd = entry(SystemFields::Dnd5e {
            challenge_rating: 0.0,
            creature_type: String::new(),
            legendary_actions: true,
            hit_points: None,
            armor_class: None,
            alignment: None,
        });
        assert!(dnd.traits().is_empty());
        assert!(dnd.legendary_actions());
        let dsa = entry(SystemFields::Dsa5 {
            level: None,
            species: Some("elf".to_string()),
            culture: None,
            profession: Some("mage".to_string()),
            hit_points: None,
        });
        assert_eq!(dsa.traits(), vec!["elf", "mage"]);
        assert_eq!(dsa.system_id(), "dsa5");
    }
}
