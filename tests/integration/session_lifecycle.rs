//! Integration tests for session construction, load, save and reconciliation

use super::test_utils::{sample_defaults, Workspace};
use serde_json::json;
use settings_store::{
    ConfigurationError, Format, Session, SessionState, SettingsError, ShapeMismatchPolicy,
};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_first_run_writes_defaults_as_json() {
    let ws = Workspace::new();
    let path = ws.file("settings.json");

    let session = Session::builder()
        .path(&path)
        .defaults(json!({"section": {"key": "value"}}))
        .build()
        .unwrap();

    assert_eq!(
        ws.read("settings.json"),
        "{\n    \"section\": {\n        \"key\": \"value\"\n    }\n}"
    );
    assert_eq!(session.state(), SessionState::Loaded);
    assert_eq!(session.format(), Format::Json);
}

#[test]
fn test_existing_file_is_loaded_not_overwritten() {
    let ws = Workspace::new();
    ws.write("settings.json", r#"{"section": {"key": "mine"}, "extra": 5}"#);

    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .build()
        .unwrap();

    assert_eq!(
        session.settings().to_plain().unwrap(),
        json!({"section": {"key": "mine"}, "extra": 5})
    );
    assert_eq!(
        ws.read("settings.json"),
        r#"{"section": {"key": "mine"}, "extra": 5}"#
    );
}

#[test]
fn test_sanitize_on_load_reconciles_memory_only() {
    let ws = Workspace::new();
    ws.write("settings.json", r#"{"section": {"key": "mine", "extra": "x"}}"#);

    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .sanitize_on_load(true)
        .build()
        .unwrap();

    assert_eq!(
        session.settings().to_plain().unwrap(),
        json!({"section": {"key": "mine", "n": 1}})
    );
    assert!(ws.read("settings.json").contains("extra"));
    assert_eq!(session.state(), SessionState::Dirty);
}

#[test]
fn test_sanitize_on_load_with_nothing_to_change_stays_loaded() {
    let ws = Workspace::new();
    ws.write("settings.json", r#"{"section": {"key": "mine", "n": 2}}"#);

    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .sanitize_on_load(true)
        .build()
        .unwrap();

    assert_eq!(session.state(), SessionState::Loaded);
}

#[test]
fn test_sanitize_on_save_cleans_written_file() {
    let ws = Workspace::new();
    ws.write("settings.json", r#"{"section": {"key": "mine", "extra": "x"}}"#);

    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .sanitize_on_save(true)
        .build()
        .unwrap();
    assert!(session.settings().mapping("section").unwrap().contains_key("extra").unwrap());

    session.save().unwrap();

    let written: serde_json::Value = serde_json::from_str(&ws.read("settings.json")).unwrap();
    assert_eq!(written, json!({"section": {"key": "mine", "n": 1}}));
}

#[test]
fn test_sanitize_does_not_trigger_autosave_callbacks() {
    let ws = Workspace::new();
    ws.write("settings.json", r#"{"section": {"key": "mine", "extra": "x"}}"#);

    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .build()
        .unwrap();

    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);
    session.settings().add_callback(move || {
        counter.set(counter.get() + 1);
        Ok(())
    });

    let applied = session.sanitize().unwrap();
    assert_eq!(applied.len(), 2);
    assert_eq!(fired.get(), 0);
    assert!(session.is_dirty());
}

#[test]
fn test_shape_mismatch_policy_replace() {
    let ws = Workspace::new();
    ws.write("settings.json", r#"{"section": "flattened"}"#);

    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .shape_mismatch(ShapeMismatchPolicy::ReplaceWithDefault)
        .sanitize_on_load(true)
        .build()
        .unwrap();

    assert_eq!(session.settings().to_plain().unwrap(), sample_defaults());
}

#[test]
fn test_ini_rejects_top_level_scalar_and_leaves_file_untouched() {
    let ws = Workspace::new();
    let session = Session::builder()
        .path(ws.file("settings.ini"))
        .defaults(json!({"section": {"key": "value"}}))
        .build()
        .unwrap();
    let before = ws.read("settings.ini");

    session.settings().set("flat", "x").unwrap();
    let result = session.save();

    assert!(matches!(
        result,
        Err(SettingsError::StructuralFormatMismatch {
            format: Format::Ini,
            ..
        })
    ));
    assert_eq!(ws.read("settings.ini"), before);
    assert_eq!(session.state(), SessionState::Dirty);
}

#[test]
fn test_separate_read_and_write_paths() {
    let ws = Workspace::new();
    ws.write("in.json", r#"{"section": {"key": "from-input", "n": 3}}"#);

    let session = Session::builder()
        .read_path(ws.file("in.json"))
        .write_path(ws.file("out.json"))
        .defaults(sample_defaults())
        .build()
        .unwrap();
    assert!(!ws.file("out.json").exists());

    session.settings().mapping("section").unwrap().set("n", 4).unwrap();
    session.save().unwrap();

    let written: serde_json::Value = serde_json::from_str(&ws.read("out.json")).unwrap();
    assert_eq!(written, json!({"section": {"key": "from-input", "n": 4}}));
    assert_eq!(
        ws.read("in.json"),
        r#"{"section": {"key": "from-input", "n": 3}}"#
    );
}

#[test]
fn test_missing_read_file_creates_write_file() {
    let ws = Workspace::new();
    let session = Session::builder()
        .read_path(ws.file("in.yaml"))
        .write_path(ws.file("nested/dir/out.yaml"))
        .defaults(sample_defaults())
        .build()
        .unwrap();

    assert!(ws.file("nested/dir/out.yaml").exists());
    assert!(!ws.file("in.yaml").exists());
    assert_eq!(session.write_path(), ws.file("nested/dir/out.yaml"));
}

#[test]
fn test_path_configuration_errors() {
    let ws = Workspace::new();

    let missing = Session::builder().read_path(ws.file("a.json")).build();
    assert!(matches!(
        missing,
        Err(SettingsError::Configuration(ConfigurationError::MissingPath))
    ));

    let conflicting = Session::builder()
        .path(ws.file("a.json"))
        .write_path(ws.file("b.json"))
        .build();
    assert!(matches!(
        conflicting,
        Err(SettingsError::Configuration(ConfigurationError::ConflictingPaths))
    ));

    let mismatched = Session::builder()
        .read_path(ws.file("a.json"))
        .write_path(ws.file("b.toml"))
        .build();
    assert!(matches!(
        mismatched,
        Err(SettingsError::Configuration(ConfigurationError::ExtensionMismatch { .. }))
    ));

    let unsupported = Session::builder().path(ws.file("a.xml")).build();
    assert!(matches!(
        unsupported,
        Err(SettingsError::Configuration(ConfigurationError::UnsupportedFormat(_)))
    ));
    assert!(!ws.file("a.xml").exists());
}

#[test]
fn test_explicit_format_overrides_extension() {
    let ws = Workspace::new();
    let session = Session::builder()
        .path(ws.file("settings.conf"))
        .format(Format::Yaml)
        .defaults(sample_defaults())
        .build()
        .unwrap();

    assert_eq!(session.format(), Format::Yaml);
    let written: serde_json::Value = serde_yaml::from_str(&ws.read("settings.conf")).unwrap();
    assert_eq!(written, sample_defaults());
}

#[test]
fn test_corrupt_file_fails_construction() {
    let ws = Workspace::new();
    ws.write("settings.json", "{ this is not json");

    let result = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .build();

    assert!(matches!(
        result,
        Err(SettingsError::Decode {
            format: Format::Json,
            ..
        })
    ));
    assert_eq!(ws.read("settings.json"), "{ this is not json");
}

#[test]
fn test_autosave_writes_each_change() {
    let ws = Workspace::new();
    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .autosave_on_change(true)
        .build()
        .unwrap();

    session
        .settings()
        .mapping("section")
        .unwrap()
        .set("key", "new value")
        .unwrap();

    let written: serde_json::Value = serde_json::from_str(&ws.read("settings.json")).unwrap();
    assert_eq!(written["section"]["key"], json!("new value"));
    assert_eq!(session.state(), SessionState::Loaded);
}

#[test]
fn test_reload_picks_up_external_edits() {
    let ws = Workspace::new();
    let mut session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .build()
        .unwrap();
    let stale = session.settings();

    ws.write("settings.json", r#"{"section": {"key": "edited", "n": 9}}"#);
    session.load().unwrap();

    assert_eq!(
        session.settings().get_path(&"section.key".into()).unwrap().to_plain().unwrap(),
        json!("edited")
    );
    assert_eq!(stale.to_plain().unwrap(), sample_defaults());
    assert!(!stale.shares_registry_with(&session.settings()));
}

#[test]
fn test_failing_callback_surfaces_after_all_ran() {
    let ws = Workspace::new();
    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .build()
        .unwrap();

    let later = Rc::new(Cell::new(false));
    let flag = Rc::clone(&later);
    session
        .settings()
        .add_callback(|| Err(SettingsError::KeyNotFound("listener".into())));
    session.settings().add_callback(move || {
        flag.set(true);
        Ok(())
    });

    let result = session.settings().set("added", 1);
    assert!(matches!(result, Err(SettingsError::KeyNotFound(_))));
    assert!(later.get());
    assert_eq!(session.settings().get_value("added").unwrap(), json!(1));
}
