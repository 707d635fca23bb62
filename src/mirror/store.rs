use dashmap::DashMap;

use crate::tree::normalize_key;
use crate::ConfigValue;

/// The in-memory nested map, keyed by tracked top-level key.
///
/// The key set doubles as the tracked-key bookkeeping: a key is present iff
/// it was added and fetched successfully at least once. Replacement is
/// atomic per entry, so readers never observe a torn subtree.
#[derive(Debug, Default)]
pub struct MirrorStore {
    entries: DashMap<String, ConfigValue>,
}

impl MirrorStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Assign `subtree` under `key`, replacing any prior value in full.
    /// Never merges: leaves deleted upstream vanish here too.
    pub(crate) fn replace(
        &self,
        key: &str,
        subtree: ConfigValue,
    ) {
        self.entries.insert(normalize_key(key).to_string(), subtree);
    }

    /// The stored subtree, or `None` for a key never tracked. Never panics.
    pub fn get(
        &self,
        key: &str,
    ) -> Option<ConfigValue> {
        self.entries.get(normalize_key(key)).map(|entry| entry.value().clone())
    }

    /// Resolve a dotted path whose first segment is a tracked key, e.g.
    /// `lookup("app.db.host")`.
    pub fn lookup(
        &self,
        path: &str,
    ) -> Option<ConfigValue> {
        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, rest),
            None => (path, ""),
        };
        let entry = self.entries.get(normalize_key(root))?;
        entry.value().lookup(rest).cloned()
    }

    /// Top-level tracked keys only - nested paths do not count.
    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.entries.contains_key(normalize_key(key))
    }

    pub fn tracked_keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
