//! Per-game-system extractors.
//!
//! Each supported ruleset gets one [`SystemExtractor`] that knows where its
//! documents keep the fields the index cares about. Extractors are stateless
//! and registered by game-system id in the
//! [`ExtractorRegistry`](crate::ExtractorRegistry).

pub mod cpr;
pub mod dnd5e;
pub mod dsa5;
pub mod pf2e;

use crate::Document;
use crate::consts::{CREATURE_TYPES, DEFAULT_DESCRIPTION_LENGTH, DEFAULT_ICONS_DIR, DEFAULT_PORTRAIT, FALLBACK_DESCRIPTION};
use crate::error::{ErrorKind, Result};
use crate::field::Coerce;
use crate::models::{ExtractionResult, IndexEntry, PackRef, Size, SystemFields};
use exn::OptionExt;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, trace};

/// Knobs shared by every extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Maximum description length in characters, ellipsis included.
    pub description_length: usize,
}
impl Default for ExtractOptions {
    fn default() -> Self {
        Self { description_length: DEFAULT_DESCRIPTION_LENGTH }
    }
}

pub trait SystemExtractor: Send + Sync {
    /// The host's identifier for the game system, e.g. `"dnd5e"`.
    fn system_id(&self) -> &'static str;

    /// Document types that describe a creature in this system.
    fn eligible_types(&self) -> &'static [&'static str] {
        CREATURE_TYPES
    }

    fn is_eligible(&self, document_type: &str) -> bool {
        self.eligible_types().contains(&document_type)
    }

    /// Map one document to an entry, failing on anything unexpected.
    fn try_extract(&self, document: &Document, pack: PackRef<'_>, options: &ExtractOptions) -> Result<IndexEntry>;

    /// System fields used on a fallback entry.
    fn fallback_fields(&self) -> SystemFields;

    /// Map one document to an entry. Never fails.
    ///
    /// Errors and panics from [`try_extract`](Self::try_extract) are turned
    /// into a fallback entry carrying the document's identity, default
    /// system fields and an `error_count` of one, so a single malformed
    /// document costs its details but never its place in the index.
    fn extract(&self, document: &Document, pack: PackRef<'_>, options: &ExtractOptions) -> ExtractionResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.try_extract(document, pack, options)))
            .unwrap_or_else(|payload| Err(exn::Exn::from(ErrorKind::Panicked(panic_message(payload.as_ref())))));
        match outcome {
            Ok(entry) => ExtractionResult::ok(entry),
            Err(err) => {
                debug!(
                    system = self.system_id(),
                    pack = pack.id,
                    document = document.id().unwrap_or_default(),
                    error = %err,
                    "extraction failed, using fallback entry"
                );
                ExtractionResult::failed(fallback_entry(document, pack, self.fallback_fields()))
            },
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Placeholder entry for a document that could not be extracted.
pub fn fallback_entry(document: &Document, pack: PackRef<'_>, system: SystemFields) -> IndexEntry {
    IndexEntry {
        id: document.id().unwrap_or_default().to_string(),
        pack_id: pack.id.to_string(),
        pack_label: pack.label.to_string(),
        name: document.name().unwrap_or("Unknown").to_string(),
        kind: document.document_type().unwrap_or_default().to_string(),
        size: Size::default(),
        has_spellcasting: false,
        has_image: None,
        description: Some(FALLBACK_DESCRIPTION.to_string()),
        extraction_failed: true,
        system,
    }
}

/// Fields every system fills the same way. Requires a name; an entry
/// without one is useless to a human picking creatures.
pub(crate) fn base_entry(document: &Document, pack: PackRef<'_>, system: SystemFields) -> Result<IndexEntry> {
    let name = document.name().ok_or_raise(|| ErrorKind::MissingField("name"))?;
    Ok(IndexEntry {
        id: document.id().unwrap_or_default().to_string(),
        pack_id: pack.id.to_string(),
        pack_label: pack.label.to_string(),
        name: name.to_string(),
        kind: document.document_type().unwrap_or_default().to_string(),
        size: Size::default(),
        has_spellcasting: false,
        has_image: has_image(document),
        description: None,
        extraction_failed: false,
        system,
    })
}

/// `None` if the document has no `img` field at all.
fn has_image(document: &Document) -> Option<bool> {
    document.root().get("img")?;
    Some(document.image().is_some_and(|img| !is_placeholder_image(img)))
}

fn is_placeholder_image(img: &str) -> bool {
    img == DEFAULT_PORTRAIT || img.contains(DEFAULT_ICONS_DIR)
}

/// Size from the first path that holds one. Unknown words fall back to
/// medium rather than failing the whole document.
pub(crate) fn size(document: &Document, paths: &[&str]) -> Size {
    let Some(raw) = document.first::<String>(paths) else {
        return Size::default();
    };
    raw.parse().unwrap_or_else(|_| {
        trace!(size = %raw, "unrecognized size, using medium");
        Size::default()
    })
}

pub(crate) fn description(document: &Document, paths: &[&str], options: &ExtractOptions) -> Option<String> {
    let html = document.first::<String>(paths)?;
    crate::text::summarize(&html, options.description_length)
}

/// Read a required numeric field: absent or `null` is `default`, anything
/// present that doesn't coerce is a parse error.
pub(crate) fn number_or<T: Coerce>(document: &Document, path: &str, field: &'static str, default: T) -> Result<T> {
    match document.get(path) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => T::coerce(value).ok_or_raise(|| ErrorKind::ParseError { field, value: value.to_string() }),
    }
}

/// Lower-cased, trimmed, de-duplicated labels in first-seen order.
pub(crate) fn normalize_labels(labels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.trim().to_lowercase();
        if !label.is_empty() && !out.contains(&label) {
            out.push(label);
        }
    }
    out
}
