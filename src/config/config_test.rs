use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use crate::RefreshPolicy;
use crate::RetryPolicy;
use crate::Settings;
use crate::WatchMode;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();

    assert_eq!(settings.registry.endpoint, "http://127.0.0.1:4001");
    assert_eq!(settings.retry.max_attempts, 3);
    assert_eq!(settings.retry.delay_ms, 500);
    assert_eq!(settings.watch.mode, WatchMode::Poll);
    assert_eq!(settings.watch.timeout_ms, 5_000);
    assert_eq!(settings.refresh, RefreshPolicy::FailFast);
}

#[test]
fn test_retry_policy_delay() {
    let policy = RetryPolicy {
        max_attempts: 3,
        delay_ms: 250,
    };
    assert_eq!(policy.delay().as_millis(), 250);
}

#[test]
#[serial]
fn test_load_from_file() {
    let file = write_config(
        r#"
refresh = "best_effort"

[registry]
endpoint = "http://registry.internal:4001"

[retry]
max_attempts = 5
delay_ms = 100

[watch]
mode = "push"
timeout_ms = 1000
"#,
    );

    let settings = Settings::load(file.path().to_str()).expect("load settings");
    assert_eq!(settings.registry.endpoint, "http://registry.internal:4001");
    assert_eq!(settings.retry.max_attempts, 5);
    assert_eq!(settings.retry.delay_ms, 100);
    assert_eq!(settings.watch.mode, WatchMode::Push);
    assert_eq!(settings.watch.timeout_ms, 1000);
    // Unset fields keep their defaults
    assert_eq!(settings.watch.channel_capacity, 64);
    assert_eq!(settings.refresh, RefreshPolicy::BestEffort);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = write_config("[retry]\nmax_attempts = 5\n");

    temp_env::with_var("CONFMIRROR__RETRY__MAX_ATTEMPTS", Some("7"), || {
        let settings = Settings::load(file.path().to_str()).expect("load settings");
        assert_eq!(settings.retry.max_attempts, 7);
    });
}

#[test]
#[serial]
fn test_invalid_watch_mode_rejected() {
    let file = write_config("[watch]\nmode = \"pull\"\n");

    let result = Settings::load(file.path().to_str());
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_missing_file_rejected() {
    let result = Settings::load(Some("/nonexistent/confmirror"));
    assert!(result.is_err());
}
