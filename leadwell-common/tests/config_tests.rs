//! Configuration resolution tests
//!
//! Covers:
//! - Missing TOML file → defaults, no failure
//! - Malformed TOML → configuration error
//! - Root folder priority: CLI → ENV → TOML → default
//! - Model API key priority: ENV → TOML, missing key is fatal
//!
//! Note: uses serial_test because several tests manipulate process-wide
//! environment variables.

use leadwell_common::config::{
    load_toml_config, resolve_api_key, resolve_root_folder, ConfigOverrides, ReasoningConfig,
    ServiceConfig, StorageBackend, TomlConfig, API_KEY_ENVS, DEFAULT_PORT, ROOT_FOLDER_ENV,
};
use leadwell_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn clear_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    for name in API_KEY_ENVS {
        env::remove_var(name);
    }
}

fn toml_with_key(key: &str) -> TomlConfig {
    TomlConfig {
        reasoning: ReasoningConfig {
            api_key: Some(key.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_missing_toml_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = load_toml_config(&path).expect("missing file must not be an error");

    assert!(config.root_folder.is_none());
    assert!(config.port.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_malformed_toml_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number").unwrap();

    let result = load_toml_config(file.path());

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_toml_file_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = 9000\nstorage = \"memory\"\n[reasoning]\napi_key = \"sk-file\"").unwrap();

    let config = load_toml_config(file.path()).unwrap();

    assert_eq!(config.port, Some(9000));
    assert_eq!(config.storage, Some(StorageBackend::Memory));
    assert_eq!(config.reasoning.api_key.as_deref(), Some("sk-file"));
}

#[test]
#[serial]
fn test_root_folder_cli_wins() {
    clear_env();
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &toml);

    assert_eq!(resolved, PathBuf::from("/from/cli"));
    clear_env();
}

#[test]
#[serial]
fn test_root_folder_env_beats_toml() {
    clear_env();
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &toml);

    assert_eq!(resolved, PathBuf::from("/from/env"));
    clear_env();
}

#[test]
#[serial]
fn test_root_folder_toml_then_default() {
    clear_env();
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };
    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/from/toml"));

    let fallback = resolve_root_folder(None, &TomlConfig::default());
    assert!(fallback.to_string_lossy().contains("leadwell"));
}

#[test]
#[serial]
fn test_api_key_missing_is_fatal() {
    clear_env();

    let result = resolve_api_key(&TomlConfig::default());

    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("OPENAI_API_KEY")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_api_key_whitespace_counts_as_missing() {
    clear_env();
    env::set_var("OPENAI_API_KEY", "   ");

    let result = resolve_api_key(&toml_with_key(""));

    assert!(result.is_err());
    clear_env();
}

#[test]
#[serial]
fn test_api_key_env_beats_toml() {
    clear_env();
    env::set_var("OPENAI_API_KEY", "sk-env");

    let key = resolve_api_key(&toml_with_key("sk-toml")).unwrap();

    assert_eq!(key, "sk-env");
    clear_env();
}

#[test]
#[serial]
fn test_api_key_secondary_env_name() {
    clear_env();
    env::set_var("LEADWELL_OPENAI_API_KEY", "sk-secondary");

    let key = resolve_api_key(&TomlConfig::default()).unwrap();

    assert_eq!(key, "sk-secondary");
    clear_env();
}

#[test]
#[serial]
fn test_service_config_defaults() {
    clear_env();
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/leadwell")),
        ..toml_with_key("sk-toml")
    };

    let config = ServiceConfig::resolve(&ConfigOverrides::default(), &toml).unwrap();

    assert_eq!(config.root_folder, PathBuf::from("/srv/leadwell"));
    assert_eq!(config.database_path, PathBuf::from("/srv/leadwell/leadwell.db"));
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.storage, StorageBackend::Sqlite);
    assert_eq!(config.log_level, "info");
    assert!(config.seed_reference_data);
    assert_eq!(config.reasoning.model, "gpt-4o");
    assert_eq!(config.reasoning.timeout, Duration::from_secs(30));
    assert_eq!(config.listen_address(), format!("127.0.0.1:{}", DEFAULT_PORT));
}

#[test]
#[serial]
fn test_service_config_cli_overrides_toml() {
    clear_env();
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/leadwell")),
        database_file: Some(PathBuf::from("/var/db/crm.db")),
        port: Some(8000),
        storage: Some(StorageBackend::Sqlite),
        ..toml_with_key("sk-toml")
    };
    let overrides = ConfigOverrides {
        port: Some(9100),
        storage: Some(StorageBackend::Memory),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    let config = ServiceConfig::resolve(&overrides, &toml).unwrap();

    assert_eq!(config.port, 9100);
    assert_eq!(config.storage, StorageBackend::Memory);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.database_path, PathBuf::from("/var/db/crm.db"));
}
