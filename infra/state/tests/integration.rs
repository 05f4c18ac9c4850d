use mora_domain::{Value, ValueKind};
use mora_state::*;
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn entry(module: &str, name: &str, value: &str) -> StateConfigEntry {
    StateConfigEntry::new(module, name, ValueKind::String, value)
}

#[test]
fn test_missing_snapshot_opens_empty() {
    let temp = TempDir::new().unwrap();
    let state = StateStore::builder().path(temp.path().join("state.mora")).open().unwrap();

    assert!(state.is_empty());
    assert!(state.find_config("custom_image", "test").is_none());
}

#[test]
fn test_reopen_keeps_last_inserted_entry() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/state.mora");

    {
        let state = StateStore::builder().path(&path).open().unwrap();
        state.append(entry("cloudflared", "email", "old@example.com")).unwrap();
        state.append(entry("cloudflared", "email", "new@example.com")).unwrap();
        state.append(entry("custom_image", "test", "value")).unwrap();
    }

    let state = StateStore::builder().path(&path).open().unwrap();
    assert_eq!(state.len(), 3);

    let email = state.find_config("cloudflared", "email").unwrap();
    assert_eq!(email.value, b"new@example.com");

    let history: Vec<_> = state
        .history("cloudflared", "email")
        .iter()
        .map(|e| String::from_utf8_lossy(&e.value).into_owned())
        .collect();
    assert_eq!(history, ["old@example.com", "new@example.com"]);
}

#[test]
fn test_compressed_snapshot_reopens() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.mora");

    {
        let state = StateStore::builder().path(&path).compression(Compression::Lz4).open().unwrap();
        let secret = Value::secret("s3cr3t");
        state.append(StateConfigEntry::from_value("custom_image", "test", &secret)).unwrap();
    }

    // Reading does not depend on the configured compression.
    let state = StateStore::builder().path(&path).open().unwrap();
    let stored = state.find_config("custom_image", "test").unwrap();
    assert_eq!(stored.kind, ValueKind::Secret);
    assert_eq!(stored.to_value().unwrap().expose(), "s3cr3t");
}

#[test]
fn test_orphaned_temp_files_are_purged() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.mora");
    let orphan = temp.path().join("state.mora.moratmp.42.1");
    let unrelated = temp.path().join("other.moratmp.42.1");
    fs::write(&orphan, b"partial").unwrap();
    fs::write(&unrelated, b"keep").unwrap();

    let _state = StateStore::builder().path(&path).open().unwrap();

    assert!(!orphan.exists());
    assert!(unrelated.exists());
}

#[test]
fn test_corrupted_snapshot_fails_to_open() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.mora");
    fs::write(&path, b"definitely not a state log").unwrap();

    let err = StateStore::builder().path(&path).open().unwrap_err();
    assert!(matches!(err, StateError::Corrupted { .. }), "got: {err:?}");
    assert_eq!(err.variant_name(), "Corrupted");
}

#[test]
fn test_clones_share_the_log() {
    let state = StateStore::in_memory();
    let other = state.clone();

    state.append(entry("custom_image", "test", "a")).unwrap();
    assert!(other.contains("custom_image", "test"));
    assert!(!other.contains("custom_image", "missing"));
    assert!(!other.contains("cloudflared", "test"));
}

proptest! {
    #[test]
    fn prop_lookup_observes_the_latest_append(values in prop::collection::vec("[a-z]{1,8}", 1..20)) {
        let state = StateStore::in_memory();
        for value in &values {
            state.append(entry("custom_image", "test", value)).unwrap();
            let latest = state.find_config("custom_image", "test").unwrap();
            prop_assert_eq!(&latest.value, value.as_bytes());
        }
        prop_assert_eq!(state.history("custom_image", "test").len(), values.len());
    }
}
