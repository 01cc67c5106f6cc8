use std::collections::BTreeMap;

use log::debug;

use super::Atlas;

/// Name-keyed set of live atlases with a fallback default.
///
/// Whoever creates or destroys an atlas registers or removes it here.
#[derive(Debug, Clone)]
pub struct AtlasRegistry {
    default_atlas: Atlas,
    atlases: BTreeMap<String, Atlas>,
}

impl AtlasRegistry {
    pub fn new(default_atlas: Atlas) -> Self {
        Self {
            default_atlas,
            atlases: BTreeMap::new(),
        }
    }

    /// Register an atlas under its own name, returning any atlas it replaces
    pub fn insert(&mut self, atlas: Atlas) -> Option<Atlas> {
        debug!("Registering atlas '{}' ({} sprites)", atlas.name(), atlas.len());
        self.atlases.insert(atlas.name().to_string(), atlas)
    }

    pub fn remove(&mut self, name: &str) -> Option<Atlas> {
        self.atlases.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Atlas> {
        self.atlases.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.atlases.contains_key(name)
    }

    /// The atlas named `name`, or the default atlas when none matches
    pub fn find(&self, name: &str) -> &Atlas {
        self.get(name).unwrap_or(&self.default_atlas)
    }

    pub fn default_atlas(&self) -> &Atlas {
        &self.default_atlas
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.atlases.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }
}
