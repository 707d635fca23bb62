use std::collections::BTreeMap;

use tracing::warn;

use crate::ConfigValue;
use crate::Error;
use crate::KeyValue;
use crate::RegistryNode;
use crate::Result;

/// Strip leading and trailing slashes from a registry key.
pub(crate) fn normalize_key(key: &str) -> &str {
    key.trim_matches('/')
}

fn last_segment(key: &str) -> &str {
    normalize_key(key).rsplit('/').next().unwrap_or_default()
}

/// Rebuild the subtree rooted at `key` from a flat listing sorted ascending
/// by key.
///
/// Every pair key has `key`'s own prefix stripped so the result is relative
/// to the query root. A pair addressing the root itself makes the whole
/// result a leaf.
///
/// # Errors
/// - [`Error::EmptyResult`] if `pairs` is empty - a key with zero matches
///   must be distinguishable from a key that exists but is empty
pub fn from_flat(
    key: &str,
    pairs: &[KeyValue],
) -> Result<ConfigValue> {
    if pairs.is_empty() {
        return Err(Error::EmptyResult(key.to_string()));
    }

    let root = normalize_key(key);
    let mut map = BTreeMap::new();
    let mut direct = None;

    for pair in pairs {
        let full = normalize_key(&pair.key);
        // Prefix stripping is segment-aligned: "a/bc" is not under "a/b".
        let relative = if root.is_empty() {
            full
        } else if full == root {
            ""
        } else if let Some(rest) = full.strip_prefix(root).and_then(|rest| rest.strip_prefix('/')) {
            rest
        } else {
            warn!(key = %pair.key, root, "listing entry outside query root; skipped");
            continue;
        };

        if relative.is_empty() {
            direct = Some(pair.value.clone());
            continue;
        }

        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        insert_segments(&mut map, &segments, &pair.value);
    }

    if map.is_empty() {
        if let Some(value) = direct {
            // The root carries its own value: the key is a leaf, not a subtree.
            return Ok(ConfigValue::Leaf(value));
        }
        return Err(Error::EmptyResult(key.to_string()));
    }

    Ok(ConfigValue::Tree(map))
}

/// Rebuild the subtree rooted at `key` from a recursive node result.
///
/// A node carrying a direct value maps to a leaf. Otherwise each child is
/// keyed by its last path segment, skipping a child identical to its parent
/// (registry APIs return an empty directory as its own only child).
pub fn from_node(
    key: &str,
    node: &RegistryNode,
) -> ConfigValue {
    if let Some(value) = &node.value {
        return ConfigValue::Leaf(value.clone());
    }

    let mut map = BTreeMap::new();
    for child in &node.children {
        if normalize_key(&child.key) == normalize_key(key) {
            continue;
        }
        map.insert(last_segment(&child.key).to_string(), from_node(&child.key, child));
    }
    ConfigValue::Tree(map)
}

/// Walk/create intermediate mapping levels for all but the last segment and
/// assign the leaf at the last. Re-inserting an existing path overwrites.
fn insert_segments(
    map: &mut BTreeMap<String, ConfigValue>,
    segments: &[&str],
    value: &str,
) {
    match segments {
        [] => {}
        [leaf] => {
            map.insert(leaf.to_string(), ConfigValue::leaf(value));
        }
        [head, rest @ ..] => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(ConfigValue::tree);
            if !child.is_tree() {
                *child = ConfigValue::tree();
            }
            if let ConfigValue::Tree(inner) = child {
                insert_segments(inner, rest, value);
            }
        }
    }
}
