use std::collections::HashMap;

use serde::Deserialize;

use super::*;

const DEFAULTS: PropDefaults = PropDefaults { prop_id: "puzzle-test", port: 3999 };

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |key| map.get(key).cloned()
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
struct Knobs {
    hold_ms: u64,
    code: Vec<u8>,
}

impl Default for Knobs {
    fn default() -> Self {
        Self { hold_ms: 2000, code: vec![1, 2, 3] }
    }
}

#[test]
fn defaults_apply_when_env_is_empty() {
    let settings = PropSettings::from_lookup(DEFAULTS, lookup(&[]));
    assert_eq!(settings.prop_id, "puzzle-test");
    assert_eq!(settings.port, 3999);
    assert_eq!(settings.room_controller_url, None);
    assert_eq!(settings.public_dir, PathBuf::from(DEFAULT_PUBLIC_DIR));
    assert_eq!(settings.prop_config, None);
    assert_eq!(settings.room_update_interval, Duration::from_secs(DEFAULT_ROOM_UPDATE_INTERVAL_SECS));
}

#[test]
fn env_overrides_are_applied() {
    let settings = PropSettings::from_lookup(
        DEFAULTS,
        lookup(&[
            ("PORT", "4100"),
            ("PROP_ID", "custom"),
            ("ROOM_CONTROLLER_URL", "ws://rc.local:3100"),
            ("PUBLIC_DIR", "/srv/prop"),
            ("PROP_CONFIG", "/etc/prop.json"),
            ("ROOM_UPDATE_INTERVAL_SECS", "5"),
        ]),
    );
    assert_eq!(settings.port, 4100);
    assert_eq!(settings.prop_id, "custom");
    assert_eq!(settings.room_controller_url.as_deref(), Some("ws://rc.local:3100"));
    assert_eq!(settings.public_dir, PathBuf::from("/srv/prop"));
    assert_eq!(settings.prop_config, Some(PathBuf::from("/etc/prop.json")));
    assert_eq!(settings.room_update_interval, Duration::from_secs(5));
}

#[test]
fn invalid_and_blank_values_fall_back() {
    let settings = PropSettings::from_lookup(
        DEFAULTS,
        lookup(&[("PORT", "not-a-port"), ("ROOM_CONTROLLER_URL", "  "), ("ROOM_UPDATE_INTERVAL_SECS", "0")]),
    );
    assert_eq!(settings.port, 3999);
    assert_eq!(settings.room_controller_url, None);
    assert_eq!(settings.room_update_interval, Duration::from_secs(1));
}

#[test]
fn prop_config_overlays_defaults() {
    let knobs: Knobs = parse_prop_config(r#"{"holdMs": 500}"#).unwrap();
    assert_eq!(knobs, Knobs { hold_ms: 500, code: vec![1, 2, 3] });
}

#[test]
fn missing_prop_config_path_uses_defaults() {
    let knobs: Knobs = load_prop_config(None).unwrap();
    assert_eq!(knobs, Knobs::default());
}

#[test]
fn unreadable_prop_config_is_an_error() {
    let err = load_prop_config::<Knobs>(Some(Path::new("/nonexistent/prop.json"))).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
