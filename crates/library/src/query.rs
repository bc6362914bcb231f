//! Encounter-building queries over the creature index.

use crate::build::IndexBuilder;
use crate::error::Result;
use crate::host::creature_packs;
use bestiary_config::QueryConfig;
use bestiary_extract::{IndexEntry, Size};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Match on the power metric (challenge rating or level). Entries without
/// one never match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PowerFilter {
    Exact(f64),
    /// Inclusive on both ends; a missing bound is open.
    Range { min: Option<f64>, max: Option<f64> },
}
impl PowerFilter {
    pub fn matches(&self, power: Option<f64>) -> bool {
        let Some(power) = power else {
            return false;
        };
        match *self {
            Self::Exact(value) => (power - value).abs() < f64::EPSILON,
            Self::Range { min, max } => min.is_none_or(|min| power >= min) && max.is_none_or(|max| power <= max),
        }
    }
}

/// What to look for. Every criterion is optional and all given criteria
/// must hold.
///
/// ```
/// use bestiary_extract::Size;
/// use bestiary_library::query::Criteria;
///
/// let criteria = Criteria::default().power_range(Some(3.0), Some(8.0)).size(Size::Large).require_trait("undead");
/// assert_eq!(criteria.traits, ["undead"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub power: Option<PowerFilter>,
    pub size: Option<Size>,
    /// Case-insensitive.
    pub rarity: Option<String>,
    /// Labels an entry must all carry, case-insensitive.
    pub traits: Vec<String>,
    pub spellcasting: Option<bool>,
    pub legendary: Option<bool>,
    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Criteria {
    pub fn power(mut self, value: f64) -> Self {
        self.power = Some(PowerFilter::Exact(value));
        self
    }

    pub fn power_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.power = Some(PowerFilter::Range { min, max });
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn rarity(mut self, rarity: impl Into<String>) -> Self {
        self.rarity = Some(rarity.into());
        self
    }

    pub fn require_trait(mut self, label: impl Into<String>) -> Self {
        self.traits.push(label.into());
        self
    }

    pub fn spellcasting(mut self, spellcasting: bool) -> Self {
        self.spellcasting = Some(spellcasting);
        self
    }

    pub fn legendary(mut self, legendary: bool) -> Self {
        self.legendary = Some(legendary);
        self
    }

    pub fn name_contains(mut self, text: impl Into<String>) -> Self {
        self.name_contains = Some(text.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn matches(&self, entry: &IndexEntry) -> bool {
        if let Some(power) = &self.power
            && !power.matches(entry.power())
        {
            return false;
        }
        if self.size.is_some_and(|size| entry.size != size) {
            return false;
        }
        if let Some(rarity) = &self.rarity
            && !entry.rarity().is_some_and(|r| r.eq_ignore_ascii_case(rarity))
        {
            return false;
        }
        if !self.traits.is_empty() {
            let labels = entry.traits();
            let has = |wanted: &String| labels.iter().any(|label| label.eq_ignore_ascii_case(wanted.trim()));
            if !self.traits.iter().all(has) {
                return false;
            }
        }
        if self.spellcasting.is_some_and(|wanted| entry.has_spellcasting != wanted) {
            return false;
        }
        if self.legendary.is_some_and(|wanted| entry.legendary_actions() != wanted) {
            return false;
        }
        self.name_matches(&entry.name)
    }

    fn name_matches(&self, name: &str) -> bool {
        self.name_contains.as_deref().is_none_or(|text| name.to_lowercase().contains(&text.trim().to_lowercase()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Packs listed by name in a [`Summary`].
    pub sample_packs: usize,
}
impl Default for QueryOptions {
    fn default() -> Self {
        Self::from(&QueryConfig::default())
    }
}
impl From<&QueryConfig> for QueryOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
            sample_packs: config.sample_packs,
        }
    }
}
impl QueryOptions {
    fn limit(&self, criteria: &Criteria) -> usize {
        criteria.limit.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

/// A document found by scanning pack listings instead of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingHit {
    pub id: String,
    pub name: String,
    pub document_type: String,
    pub pack_id: String,
    pub pack_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Matches {
    Indexed(Vec<IndexEntry>),
    /// Listing scan results; only `name_contains` was applied.
    Fallback(Vec<ListingHit>),
}
impl Matches {
    pub fn len(&self) -> usize {
        match self {
            Self::Indexed(entries) => entries.len(),
            Self::Fallback(hits) => hits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackCount {
    pub pack_id: String,
    pub pack_label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Matches before offset and limit.
    pub total_matched: usize,
    pub returned: usize,
    pub packs_represented: usize,
    /// Packs with the most matches, largest first.
    pub sample_packs: Vec<PackCount>,
    pub criteria: Criteria,
    /// Why the index wasn't used, if it wasn't.
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub matches: Matches,
    pub summary: Summary,
}

pub struct QueryEngine {
    builder: Arc<IndexBuilder>,
    options: QueryOptions,
}

impl QueryEngine {
    pub fn new(builder: Arc<IndexBuilder>, options: QueryOptions) -> Self {
        Self { builder, options }
    }

    pub fn builder(&self) -> &Arc<IndexBuilder> {
        &self.builder
    }

    /// Query the index, building it if needed. If no index can be had, scan
    /// pack listings by name instead; that scan failing is the only error.
    #[instrument(skip(self))]
    pub async fn query(&self, criteria: &Criteria) -> Result<QueryResult> {
        match self.builder.get_index().await {
            Ok(snapshot) => Ok(self.filter(&snapshot.entries, criteria)),
            Err(err) => {
                warn!(error = %err, "creature index unavailable, scanning pack listings");
                self.scan_listings(criteria, err.to_string()).await
            },
        }
    }

    /// Filter, sort and paginate entries: ascending power (missing counts as
    /// zero), then name.
    pub fn filter(&self, entries: &[IndexEntry], criteria: &Criteria) -> QueryResult {
        let mut matched: Vec<&IndexEntry> = entries.iter().filter(|entry| criteria.matches(entry)).collect();
        matched.sort_by(|a, b| {
            let power = a.power().unwrap_or(0.0).total_cmp(&b.power().unwrap_or(0.0));
            power.then_with(|| a.name.cmp(&b.name))
        });
        let (packs_represented, sample_packs) =
            self.pack_counts(matched.iter().map(|entry| (entry.pack_id.as_str(), entry.pack_label.as_str())));
        let page: Vec<IndexEntry> =
            matched.iter().skip(criteria.offset).take(self.options.limit(criteria)).map(|e| (*e).clone()).collect();
        debug!(matched = matched.len(), returned = page.len(), "query evaluated");
        QueryResult {
            summary: Summary {
                total_matched: matched.len(),
                returned: page.len(),
                packs_represented,
                sample_packs,
                criteria: criteria.clone(),
                fallback: None,
            },
            matches: Matches::Indexed(page),
        }
    }

    async fn scan_listings(&self, criteria: &Criteria, reason: String) -> Result<QueryResult> {
        let host = self.builder.host();
        let registry = self.builder.registry();
        // Without an extractor for the active system, accept anything some
        // system calls a creature.
        let extractor = registry.get(&host.active_system()).ok();
        let eligible = |kind: &str| match &extractor {
            Some(extractor) => extractor.is_eligible(kind),
            None => registry.is_creature_type(kind),
        };
        let mut hits = Vec::new();
        for pack in creature_packs(host.as_ref()).await? {
            let listing = match host.listing(&pack.id).await {
                Ok(listing) => listing,
                Err(err) => {
                    warn!(pack = %pack.id, error = %err, "skipping pack listing");
                    continue;
                },
            };
            hits.extend(
                listing
                    .into_iter()
                    .filter(|item| eligible(&item.document_type) && criteria.name_matches(&item.name))
                    .map(|item| ListingHit {
                        id: item.id,
                        name: item.name,
                        document_type: item.document_type,
                        pack_id: pack.id.clone(),
                        pack_label: pack.label.clone(),
                    }),
            );
        }
        hits.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.pack_id.cmp(&b.pack_id)));
        let (packs_represented, sample_packs) =
            self.pack_counts(hits.iter().map(|hit| (hit.pack_id.as_str(), hit.pack_label.as_str())));
        let total_matched = hits.len();
        let page: Vec<ListingHit> = hits.into_iter().skip(criteria.offset).take(self.options.limit(criteria)).collect();
        Ok(QueryResult {
            summary: Summary {
                total_matched,
                returned: page.len(),
                packs_represented,
                sample_packs,
                criteria: criteria.clone(),
                fallback: Some(reason),
            },
            matches: Matches::Fallback(page),
        })
    }

    fn pack_counts<'a>(&self, packs: impl Iterator<Item = (&'a str, &'a str)>) -> (usize, Vec<PackCount>) {
        let mut counts: HashMap<&str, (&str, usize)> = HashMap::new();
        for (id, label) in packs {
            counts.entry(id).or_insert((label, 0)).1 += 1;
        }
        let represented = counts.len();
        let mut counts: Vec<PackCount> = counts
            .into_iter()
            .map(|(id, (label, count))| PackCount { pack_id: id.to_string(), pack_label: label.to_string(), count })
            .collect();
        counts.sort_by(|a, b| match b.count.cmp(&a.count) {
            Ordering::Equal => a.pack_label.cmp(&b.pack_label),
            ordering => ordering,
        });
        counts.truncate(self.options.sample_packs);
        (represented, counts)
    }
}
