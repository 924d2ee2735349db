//! Integration tests for Settings config loading with layered precedence.
//!
//! These tests run without a global config (temp directories only), so they
//! test the local `.mutree.toml` layer on top of compiled defaults.

use std::fs;

use tempfile::TempDir;

use mutree::application::ApplicationError;
use mutree::config::{local_config_path, Settings};

#[test]
fn given_no_local_config_when_load_then_uses_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings, Settings::default());
}

#[test]
fn given_local_config_when_load_then_overrides_specified_fields() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        r#"
levels = ["Gene", "Type", "Location"]
min_size = 3
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.levels, vec!["Gene", "Type", "Location"]);
    assert_eq!(settings.min_size, 3);
    assert_eq!(settings.sample_field, "Sample");
    assert_eq!(settings.comb_sizes, vec![1, 2]);
}

#[test]
fn given_invalid_toml_when_load_then_returns_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "levels = [\"Gene\"").unwrap();

    let result = Settings::load(Some(dir.path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_empty_levels_when_load_then_rejects_config() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "levels = []\n").unwrap();

    let err = Settings::load(Some(dir.path())).unwrap_err();

    assert!(err.to_string().contains("levels"));
}

#[test]
fn given_settings_when_serialized_then_round_trips_through_toml() {
    let settings = Settings {
        levels: vec!["Gene".into(), "Form_base".into()],
        ..Default::default()
    };

    let text = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&text).unwrap();

    assert_eq!(parsed, settings);
}
