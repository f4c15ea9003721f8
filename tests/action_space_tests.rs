// tests/action_space_tests.rs
//
// Action-space loading tests against on-disk JSON definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use ckptdiff::{load_action_space, parse_action_spec, ActionSpaceError};

fn write_space(dir: &std::path::Path, contents: &str) -> PathBuf {
    let path = dir.join("action_space.json");
    fs::write(&path, contents).unwrap();
    path
}

const SPACE_JSON: &str = r#"{
  "heads": {
    "btb_sets": {
      "base": "1024",
      "config_key": "btb_sets",
      "choices": ["512", "1024", "2048"]
    },
    "btb_ways": {
      "base": "8",
      "config_key": "btb_ways"
    }
  },
  "build_template": { "block_size": 64 }
}"#;

#[test]
fn load_returns_space_base_and_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_space(dir.path(), SPACE_JSON);

    let (space, base, template) = load_action_space(&path).unwrap();
    assert_eq!(space.heads().len(), 2);
    assert_eq!(base.values.get("btb_sets"), Some(&"1024".to_string()));
    assert_eq!(base.values.get("btb_ways"), Some(&"8".to_string()));
    assert_eq!(template["block_size"], 64);
}

#[test]
fn spec_string_through_space_yields_full_action() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_space(dir.path(), SPACE_JSON);
    let (space, _base, _template) = load_action_space(&path).unwrap();

    let mapping = parse_action_spec("btb_sets=2048").unwrap();
    let action = space.from_dict(&mapping).unwrap();
    assert_eq!(action.values.get("btb_sets"), Some(&"2048".to_string()));
    // Unspecified head filled from the base configuration.
    assert_eq!(action.values.get("btb_ways"), Some(&"8".to_string()));

    let updates = action.as_config_updates(&space);
    assert_eq!(updates.get("btb_sets"), Some(&"2048".to_string()));
}

#[test]
fn unknown_head_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_space(dir.path(), SPACE_JSON);
    let (space, _base, _template) = load_action_space(&path).unwrap();

    let mut mapping = BTreeMap::new();
    mapping.insert("l1d_sets".to_string(), "64".to_string());
    let err = space.from_dict(&mapping).unwrap_err();
    assert!(matches!(err, ActionSpaceError::UnknownHead { .. }));
    assert!(err.to_string().contains("l1d_sets"));
}

#[test]
fn missing_file_and_malformed_json_are_load_errors() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_action_space(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ActionSpaceError::Io { .. }));

    let path = write_space(dir.path(), "{ not json");
    let err = load_action_space(&path).unwrap_err();
    assert!(matches!(err, ActionSpaceError::Parse { .. }));
}

#[test]
fn bundled_default_action_space_loads() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/action_space.json");
    let (space, base, template) = load_action_space(&path).unwrap();
    assert!(space.heads().contains_key("btb_sets"));
    assert_eq!(base.values.len(), space.heads().len());
    assert!(template.is_object());
}
