//! Integration tests for batched saves and the exit flush

use super::test_utils::{sample_defaults, CountingCodec, Workspace};
use serde_json::json;
use settings_store::{Format, Session, SettingsError};

#[test]
fn test_batch_performs_single_save() {
    let ws = Workspace::new();
    let (codec, saves) = CountingCodec::new(Format::Json);
    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .autosave_on_change(true)
        .codec(Box::new(codec))
        .build()
        .unwrap();
    let initial = saves.get();

    session
        .batch(|settings| -> settings_store::Result<()> {
            let section = settings.mapping("section")?;
            section.set("key", "batched")?;
            section.set("n", 2)?;
            settings.set("extra", json!([1, 2, 3]))?;
            settings.sequence("extra")?.push(4)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(saves.get(), initial + 1);
    let written: serde_json::Value = serde_json::from_str(&ws.read("settings.json")).unwrap();
    assert_eq!(written["extra"], json!([1, 2, 3, 4]));
    assert_eq!(written["section"]["key"], json!("batched"));
}

#[test]
fn test_batch_saves_once_on_error_exit() {
    let ws = Workspace::new();
    let (codec, saves) = CountingCodec::new(Format::Json);
    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .autosave_on_change(true)
        .codec(Box::new(codec))
        .build()
        .unwrap();
    let initial = saves.get();

    let result = session.batch(|settings| -> Result<(), SettingsError> {
        settings.mapping("section")?.set("key", "partial")?;
        settings.mapping("missing")?.set("key", "never")?;
        Ok(())
    });

    assert!(matches!(result, Err(SettingsError::KeyNotFound(_))));
    assert_eq!(saves.get(), initial + 1);
    let written: serde_json::Value = serde_json::from_str(&ws.read("settings.json")).unwrap();
    assert_eq!(written["section"]["key"], json!("partial"));
}

#[test]
fn test_batch_without_autosave_saves_exactly_once() {
    let ws = Workspace::new();
    let (codec, saves) = CountingCodec::new(Format::Json);
    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .autosave_on_change(false)
        .codec(Box::new(codec))
        .build()
        .unwrap();
    let initial = saves.get();

    session
        .batch(|settings| -> settings_store::Result<()> {
            settings.set("a", 1)?;
            settings.set("b", 2)?;
            settings.mapping("section")?.set("n", 3)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(saves.get(), initial + 1);
    let written: serde_json::Value = serde_json::from_str(&ws.read("settings.json")).unwrap();
    assert_eq!(written["a"], json!(1));
    assert_eq!(written["b"], json!(2));
    assert_eq!(written["section"]["n"], json!(3));

    let result = session.batch(|settings| -> Result<(), SettingsError> {
        settings.set("a", 10)?;
        settings.set("b", 20)?;
        settings.mapping("section")?.set("n", 30)?;
        Err(SettingsError::KeyNotFound("abort".into()))
    });

    assert!(matches!(result, Err(SettingsError::KeyNotFound(_))));
    assert_eq!(saves.get(), initial + 2);
    let written: serde_json::Value = serde_json::from_str(&ws.read("settings.json")).unwrap();
    assert_eq!(written["section"]["n"], json!(30));
    assert!(!session.is_dirty());
}

#[test]
fn test_batch_guard_saves_on_drop() {
    let ws = Workspace::new();
    let (codec, saves) = CountingCodec::new(Format::Json);
    let session = Session::builder()
        .path(ws.file("settings.json"))
        .defaults(sample_defaults())
        .autosave_on_change(true)
        .codec(Box::new(codec))
        .build()
        .unwrap();
    let initial = saves.get();

    {
        let batch = session.begin_batch();
        let settings = batch.settings();
        for n in 0..5 {
            settings.mapping("section").unwrap().set("n", n).unwrap();
        }
        assert_eq!(saves.get(), initial);
        assert!(session.is_dirty());
    }

    assert_eq!(saves.get(), initial + 1);
    assert!(!session.is_dirty());
}

#[test]
fn test_exit_flush_persists_unsaved_changes() {
    let ws = Workspace::new();
    {
        let session = Session::builder()
            .path(ws.file("settings.yaml"))
            .defaults(sample_defaults())
            .autosave_on_exit(true)
            .build()
            .unwrap();
        session.settings().mapping("section").unwrap().set("key", "at exit").unwrap();
        assert!(session.is_dirty());
    }

    let reopened = Session::builder().path(ws.file("settings.yaml")).build().unwrap();
    assert_eq!(
        reopened.settings().get_path(&"section.key".into()).unwrap().to_plain().unwrap(),
        json!("at exit")
    );
}

#[test]
fn test_shutdown_reports_flush_error() {
    let ws = Workspace::new();
    let session = Session::builder()
        .path(ws.file("settings.ini"))
        .defaults(json!({"section": {"key": "value"}}))
        .autosave_on_exit(true)
        .build()
        .unwrap();
    session.settings().set("top", 1).unwrap();

    let result = session.shutdown();
    assert!(matches!(
        result,
        Err(SettingsError::StructuralFormatMismatch { .. })
    ));
}
