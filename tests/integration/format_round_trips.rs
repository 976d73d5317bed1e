//! Integration tests for every supported format through a session

use super::test_utils::Workspace;
use serde_json::{json, Value};
use settings_store::{Format, Session, SettingsError};

fn rich_defaults() -> Value {
    json!({
        "name": "demo",
        "ratio": 0.75,
        "window": {"width": 800, "height": 600, "maximized": false},
        "recent": {"files": ["a.txt", "b.txt"], "limit": 10}
    })
}

fn round_trip(file: &str, defaults: Value) -> Value {
    let ws = Workspace::new();
    {
        let session = Session::builder()
            .path(ws.file(file))
            .defaults(defaults)
            .build()
            .unwrap();
        drop(session);
    }
    let reopened = Session::builder().path(ws.file(file)).build().unwrap();
    reopened.settings().to_plain().unwrap()
}

#[test]
fn test_json_round_trip() {
    assert_eq!(round_trip("settings.json", rich_defaults()), rich_defaults());
}

#[test]
fn test_yaml_round_trip() {
    assert_eq!(round_trip("settings.yaml", rich_defaults()), rich_defaults());
    assert_eq!(round_trip("settings.yml", rich_defaults()), rich_defaults());
}

#[test]
fn test_toml_round_trip() {
    assert_eq!(round_trip("settings.toml", rich_defaults()), rich_defaults());
}

#[test]
fn test_ini_round_trip_stringifies_scalars() {
    let defaults = json!({
        "window": {"width": 800, "title": "main", "maximized": false}
    });
    assert_eq!(
        round_trip("settings.ini", defaults),
        json!({"window": {"width": "800", "title": "main", "maximized": "false"}})
    );
}

#[test]
fn test_toml_rejects_null_without_writing() {
    let ws = Workspace::new();
    let session = Session::builder()
        .path(ws.file("settings.toml"))
        .defaults(json!({"section": {"key": "value"}}))
        .build()
        .unwrap();
    let before = ws.read("settings.toml");

    session.settings().mapping("section").unwrap().set("key", Value::Null).unwrap();
    let result = session.save();

    assert!(matches!(
        result,
        Err(SettingsError::Encode {
            format: Format::Toml,
            ..
        })
    ));
    assert_eq!(ws.read("settings.toml"), before);
}

#[test]
fn test_ini_rejects_nested_sections() {
    let ws = Workspace::new();
    let result = Session::builder()
        .path(ws.file("settings.ini"))
        .defaults(json!({"section": {"inner": {"key": "value"}}}))
        .build();

    assert!(matches!(result, Err(SettingsError::Encode { .. })));
    assert!(!ws.file("settings.ini").exists());
}

#[test]
fn test_yaml_file_written_by_hand_is_readable() {
    let ws = Workspace::new();
    ws.write(
        "settings.yaml",
        "section:\n  key: value\n  items:\n    - 1\n    - 2\n",
    );
    let session = Session::builder().path(ws.file("settings.yaml")).build().unwrap();
    assert_eq!(
        session.settings().to_plain().unwrap(),
        json!({"section": {"key": "value", "items": [1, 2]}})
    );
}
