//! Integration tests for configuration resolution
//!
//! Covers:
//! - Config path priority (CLI → ENV → user config dir → defaults)
//! - TOML parsing with partial sections
//! - Secret resolution (ENV → TOML)
//! - Validation of nonsensical limits
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate KINMATCH_* variables are marked with #[serial].

use kinmatch_common::config::{
    load_toml_config, resolve_config_path, resolve_familysearch_client_id,
    resolve_generative_api_key, TomlConfig, CONFIG_ENV_VAR, FAMILYSEARCH_CLIENT_ID_ENV_VAR,
    GENERATIVE_API_KEY_ENV_VAR,
};
use kinmatch_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_cli_path_overrides_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml")));
    assert_eq!(resolved.unwrap(), Path::new("/tmp/from-cli.toml"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved.unwrap(), Path::new("/tmp/from-env.toml"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
        [server]
        port = 6001

        [logging]
        level = "debug"

        [search]
        max_name_variants = 2
        max_location_variants = 1
        max_total_requests = 4
        request_delay_ms = 0

        [ledger]
        capacity = 50

        [generative]
        enabled = true
        models = [
            { model = "primary-model" },
            { model = "backup-model", base_url = "http://localhost:9999/v1/chat/completions" },
        ]

        [providers.wikitree]
        enabled = false

        [providers.ancestry]
        enabled = true
        "#,
    );

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.server.port, 6001);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.search.max_total_requests, 4);
    assert_eq!(config.search.request_delay_ms, 0);
    assert_eq!(config.ledger.capacity, 50);
    assert_eq!(config.generative.models.len(), 2);
    assert_eq!(config.generative.models[0].model, "primary-model");
    assert_eq!(
        config.generative.models[1].base_url.as_deref(),
        Some("http://localhost:9999/v1/chat/completions")
    );
    assert!(!config.providers.wikitree.enabled);
    assert!(config.providers.ancestry.enabled);
    assert!(config.providers.chronicling_america.enabled);
}

#[test]
fn test_missing_explicit_file_is_config_error() {
    let result = load_toml_config(Path::new("/nonexistent/kinmatch/config.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_zero_capacity_rejected() {
    let file = write_config("[ledger]\ncapacity = 0\n");
    let result = load_toml_config(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_toml_rejected() {
    let file = write_config("[search\nmax_total_requests = ");
    assert!(load_toml_config(file.path()).is_err());
}

#[test]
#[serial]
fn test_generative_key_env_overrides_toml() {
    env::set_var(GENERATIVE_API_KEY_ENV_VAR, "env-key");
    let mut config = TomlConfig::default();
    config.generative.api_key = Some("toml-key".to_string());

    assert_eq!(resolve_generative_api_key(&config).as_deref(), Some("env-key"));

    env::remove_var(GENERATIVE_API_KEY_ENV_VAR);
}

#[test]
#[serial]
fn test_generative_key_falls_back_to_toml() {
    env::remove_var(GENERATIVE_API_KEY_ENV_VAR);
    let mut config = TomlConfig::default();
    config.generative.api_key = Some("toml-key".to_string());

    assert_eq!(resolve_generative_api_key(&config).as_deref(), Some("toml-key"));
}

#[test]
#[serial]
fn test_blank_secrets_are_ignored() {
    env::set_var(FAMILYSEARCH_CLIENT_ID_ENV_VAR, "   ");
    let mut config = TomlConfig::default();
    config.providers.familysearch.client_id = Some("".to_string());

    assert!(resolve_familysearch_client_id(&config).is_none());

    env::remove_var(FAMILYSEARCH_CLIENT_ID_ENV_VAR);
}
