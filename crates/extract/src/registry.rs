use crate::error::{ErrorKind, Result};
use crate::system::cpr::CprExtractor;
use crate::system::dnd5e::Dnd5eExtractor;
use crate::system::dsa5::Dsa5Extractor;
use crate::system::pf2e::Pf2eExtractor;
use crate::system::SystemExtractor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Extractors keyed by game-system id.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn SystemExtractor>>,
}

impl ExtractorRegistry {
    /// An empty registry; every lookup fails until something is registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in system.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Dnd5eExtractor);
        registry.register(Pf2eExtractor);
        registry.register(Dsa5Extractor);
        registry.register(CprExtractor);
        registry
    }

    /// Add (or replace) the extractor for its system id.
    pub fn register(&mut self, extractor: impl SystemExtractor + 'static) -> &mut Self {
        self.extractors.insert(extractor.system_id().to_string(), Arc::new(extractor));
        self
    }

    pub fn get(&self, system_id: &str) -> Result<Arc<dyn SystemExtractor>> {
        match self.extractors.get(system_id) {
            Some(extractor) => Ok(Arc::clone(extractor)),
            None => exn::bail!(ErrorKind::UnsupportedSystem(system_id.to_string())),
        }
    }

    pub fn contains(&self, system_id: &str) -> bool {
        self.extractors.contains_key(system_id)
    }

    /// Registered system ids, sorted.
    pub fn system_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Whether any registered extractor treats this document type as a
    /// creature.
    pub fn is_creature_type(&self, document_type: &str) -> bool {
        self.extractors.values().any(|extractor| extractor.is_eligible(document_type))
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry").field("systems", &self.system_ids()).finish()
    }
}
