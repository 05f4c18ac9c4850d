use mora_domain::{ConfigPoint, ModuleCapabilities, StateConfigEntry, Value, ValueKind};

#[test]
fn config_point_serializes_camel_case() {
    let point = ConfigPoint::secret("test", "Testing").with_description("Used by **tests**");
    let json = serde_json::to_value(&point).unwrap();

    assert_eq!(json["identifier"], "test");
    assert_eq!(json["displayName"], "Testing");
    assert_eq!(json["kind"], "secret");
    assert_eq!(json["description"], "Used by **tests**");
}

#[test]
fn entry_debug_redacts_secret_bytes() {
    let entry = StateConfigEntry::from_value("cloudflared", "api_key", &Value::secret("abc123"));
    let rendered = format!("{entry:?}");

    assert!(rendered.contains("redacted"));
    assert!(!rendered.contains("abc123"));
    assert!(entry.matches("cloudflared", "api_key"));
    assert!(!entry.matches("cloudflared", "email"));
}

#[test]
fn entry_decodes_back_into_value() {
    let entry = StateConfigEntry::new("cloudflared", "email", ValueKind::String, "ops@example.com");
    let value = entry.to_value().unwrap();

    assert_eq!(value.kind(), ValueKind::String);
    assert_eq!(value.expose(), "ops@example.com");
}

#[test]
fn default_capabilities_only_declare_points() {
    let caps = ModuleCapabilities::default();
    assert!(caps.contains(ModuleCapabilities::CONFIG_POINTS));
    assert!(!caps.contains(ModuleCapabilities::FUNCTIONS));
    assert_eq!(ModuleCapabilities::ALL, ModuleCapabilities::CONFIG_POINTS | ModuleCapabilities::FUNCTIONS);
}
