//! Name book — admin overrides for reward display names

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One stored name (JSON shape)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct NameEntry {
    id: String,
    name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NameFile {
    #[serde(default)]
    entries: Vec<NameEntry>,
}

/// Slot id → display name
///
/// Empty names are kept (an admin may clear a field) but never override the
/// configured name when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameBook {
    names: BTreeMap<String, String>,
}

impl NameBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot_id: &str) -> Option<&str> {
        self.names.get(slot_id).map(String::as_str)
    }

    /// Set a name, ignored for an empty id
    pub fn set(&mut self, slot_id: &str, name: impl Into<String>) {
        if slot_id.is_empty() {
            return;
        }
        self.names.insert(slot_id.to_string(), name.into());
    }

    pub fn remove(&mut self, slot_id: &str) -> bool {
        self.names.remove(slot_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names that would change a slot (non-empty)
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .filter(|(_, name)| !name.is_empty())
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        let file = NameFile {
            entries: self
                .names
                .iter()
                .map(|(id, name)| NameEntry {
                    id: id.clone(),
                    name: name.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Load from JSON; entries with an empty id are dropped
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        let file: NameFile = serde_json::from_str(json)?;
        let mut book = Self::new();
        for entry in file.entries {
            book.set(&entry.id, entry.name);
        }
        Ok(book)
    }
}
