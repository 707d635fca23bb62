use crate::ChangeAction;
use crate::RegistryEvent;

#[test]
fn test_normalize_set_family() {
    for action in ["set", "create", "created", "update", "updated", "compareAndSwap"] {
        let event = RegistryEvent::new("/app/a", action, Some("1".into()));
        let normalized = event.normalize().unwrap_or_else(|| panic!("action {action} should normalize"));
        assert_eq!(normalized.action, ChangeAction::Set);
        assert_eq!(normalized.key, "/app/a");
        assert_eq!(normalized.value.as_deref(), Some("1"));
    }
}

#[test]
fn test_normalize_delete_family() {
    for action in ["delete", "deleted", "expire", "expired", "compareAndDelete"] {
        let event = RegistryEvent::new("/app/a", action, None);
        let normalized = event.normalize().unwrap_or_else(|| panic!("action {action} should normalize"));
        assert_eq!(normalized.action, ChangeAction::Delete);
        assert_eq!(normalized.value, None);
    }
}

#[test]
fn test_normalize_unknown_action_dropped() {
    let event = RegistryEvent::new("/app/a", "compact", Some("1".into()));
    assert!(event.normalize().is_none());
}

#[test]
fn test_action_display() {
    assert_eq!(ChangeAction::Set.to_string(), "set");
    assert_eq!(ChangeAction::Delete.to_string(), "delete");
}
