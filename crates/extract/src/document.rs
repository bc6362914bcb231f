//! Raw host documents.
//!
//! Creature documents are freeform JSON whose shape depends on the game
//! system, its version, and whoever authored the content pack. Rather than
//! modelling every schema, a [`Document`] is kept as an untyped tree and read
//! through dotted paths with typed coercion (see [`Coerce`]).

use crate::field::Coerce;
use serde_json::Value;

/// A raw host document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}
impl Document {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Stable document identifier (`_id`, or `id` on exported data).
    pub fn id(&self) -> Option<&str> {
        self.str_at("_id").or_else(|| self.str_at("id"))
    }

    pub fn name(&self) -> Option<&str> {
        self.str_at("name")
    }

    /// The host's declared document type (`npc`, `character`, `vehicle`...).
    pub fn document_type(&self) -> Option<&str> {
        self.str_at("type")
    }

    pub fn image(&self) -> Option<&str> {
        self.str_at("img")
    }

    /// Look up a dotted path such as `system.details.cr`.
    ///
    /// Numeric segments index into arrays (`items.0.type`). A leading
    /// `system.` segment also matches the legacy `data.` section.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(rest) = path.strip_prefix("system.") {
            return Self::walk(&self.root, &format!("system.{rest}"))
                .or_else(|| Self::walk(&self.root, &format!("data.{rest}")));
        }
        Self::walk(&self.root, path)
    }

    fn walk<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
        path.split('.').try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(list) => segment.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        })
    }

    /// Read the first path, in order, whose value coerces to `T`.
    ///
    /// Paths that are missing, `null`, or hold something that can't be
    /// coerced are skipped, so an ordered list of paths is a list of
    /// fallbacks for the same logical field.
    pub fn first<T: Coerce>(&self, paths: &[&str]) -> Option<T> {
        paths.iter().filter_map(|path| self.get(path)).find_map(T::coerce)
    }

    /// Embedded items (spells, features, weapons...), if the document has any.
    pub fn items(&self) -> impl Iterator<Item = &Value> {
        self.root.get("items").and_then(Value::as_array).into_iter().flatten()
    }

    /// Whether any embedded item has one of the given types.
    pub fn has_item_of_type(&self, types: &[&str]) -> bool {
        self.items().filter_map(|item| item.get("type").and_then(Value::as_str)).any(|t| types.contains(&t))
    }

    fn str_at(&self, key: &str) -> Option<&str> {
        self.root.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    }
}
impl From<Value> for Document {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}
