use serde::Deserialize;
use serde::Serialize;

/// A change notification exactly as the remote store reports it, action
/// vocabulary included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEvent {
    pub key: String,
    pub action: String,
    pub value: Option<String>,
}

impl RegistryEvent {
    pub fn new(
        key: impl Into<String>,
        action: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            action: action.into(),
            value,
        }
    }

    /// Collapse the store's action vocabulary down to the two actions the
    /// callback contract knows about. Returns `None` for an action this
    /// mirror does not recognize; such events are dropped with a warning.
    pub fn normalize(self) -> Option<ChangeEvent> {
        let action = ChangeAction::parse(&self.action)?;
        Some(ChangeEvent {
            key: self.key,
            action,
            value: self.value,
        })
    }
}

/// Normalized change action. Stores report richer vocabularies
/// (create/update/expire/compareAndSwap/...); every variant folds into one
/// of these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Set,
    Delete,
}

impl ChangeAction {
    pub(crate) fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "set" | "create" | "created" | "update" | "updated" | "compareandswap" => Some(ChangeAction::Set),
            "delete" | "deleted" | "expire" | "expired" | "compareanddelete" => Some(ChangeAction::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ChangeAction::Set => write!(f, "set"),
            ChangeAction::Delete => write!(f, "delete"),
        }
    }
}

/// An immutable, normalized change record delivered to subscribers.
///
/// Delivery is at-least-once: the same event may arrive more than once, and
/// consumers that care must deduplicate themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub key: String,
    pub action: ChangeAction,
    pub value: Option<String>,
}
