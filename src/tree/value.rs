use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// A nested configuration value: a string leaf or a further mapping keyed by
/// path segment. Map levels keep key order, matching the sorted listing the
/// registry is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Leaf(String),
    Tree(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// An empty mapping level.
    pub fn tree() -> Self {
        ConfigValue::Tree(BTreeMap::new())
    }

    pub fn leaf(value: impl Into<String>) -> Self {
        ConfigValue::Leaf(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Leaf(s) => Some(s),
            ConfigValue::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            ConfigValue::Leaf(_) => None,
            ConfigValue::Tree(map) => Some(map),
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, ConfigValue::Tree(_))
    }

    /// Child under one path segment.
    pub fn get(
        &self,
        segment: &str,
    ) -> Option<&ConfigValue> {
        self.as_tree().and_then(|map| map.get(segment))
    }

    /// Descend along a dotted path, e.g. `lookup("db.pool.size")`.
    pub fn lookup(
        &self,
        path: &str,
    ) -> Option<&ConfigValue> {
        let mut current = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Leaf(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Leaf(value)
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigValue {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        ConfigValue::Tree(iter.into_iter().collect())
    }
}
