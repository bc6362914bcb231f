//! Normalizing creature documents from different game systems into one
//! index entry shape.
//!
//! A host document is read as an untyped [`Document`]; the
//! [`SystemExtractor`] registered for the active game system maps it to an
//! [`IndexEntry`]. Extraction never fails outright: a malformed document
//! produces a fallback entry and an error count instead.

mod consts;
mod document;
pub mod error;
mod field;
pub mod models;
mod registry;
pub mod system;
mod text;

pub use crate::consts::{DEFAULT_DESCRIPTION_LENGTH, FALLBACK_DESCRIPTION};
pub use crate::document::Document;
pub use crate::field::{Coerce, parse_number};
pub use crate::models::{ExtractionResult, IndexEntry, PackRef, Size, SystemFields};
pub use crate::registry::ExtractorRegistry;
pub use crate::system::{ExtractOptions, SystemExtractor, fallback_entry};
pub use crate::text::{html_to_text, truncate};
