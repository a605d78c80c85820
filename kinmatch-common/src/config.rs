//! Configuration loading
//!
//! Bootstrap configuration comes from a single TOML file. The file path is
//! resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `KINMATCH_CONFIG` environment variable
//! 3. `<config dir>/kinmatch/config.toml` when it exists
//! 4. Built-in defaults (no file)
//!
//! Secrets (generative API key, FamilySearch client id) additionally resolve
//! ENV → TOML so they can be kept out of the file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "KINMATCH_CONFIG";
/// Environment variable holding the generative provider API key
pub const GENERATIVE_API_KEY_ENV_VAR: &str = "KINMATCH_GENERATIVE_API_KEY";
/// Environment variable holding the FamilySearch client id
pub const FAMILYSEARCH_CLIENT_ID_ENV_VAR: &str = "KINMATCH_FAMILYSEARCH_CLIENT_ID";

/// Complete bootstrap configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub generative: GenerativeConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// HTTP server binding
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Rejection ledger database location
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path; defaults to the OS data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Federated search limits
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_name_variants")]
    pub max_name_variants: usize,
    #[serde(default = "default_max_location_variants")]
    pub max_location_variants: usize,
    /// Hard cap on requests issued by one provider per search
    #[serde(default = "default_max_total_requests")]
    pub max_total_requests: usize,
    /// Minimum spacing between consecutive requests to one provider
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    /// Deadline for the whole fan-out; in-flight calls are cancelled after it
    #[serde(default = "default_overall_deadline_secs")]
    pub overall_deadline_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_name_variants: default_max_name_variants(),
            max_location_variants: default_max_location_variants(),
            max_total_requests: default_max_total_requests(),
            request_delay_ms: default_request_delay_ms(),
            provider_timeout_secs: default_provider_timeout_secs(),
            overall_deadline_secs: default_overall_deadline_secs(),
        }
    }
}

/// Rejection ledger limits
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Maximum entries retained per owner (oldest evicted first)
    #[serde(default = "default_ledger_capacity")]
    pub capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: default_ledger_capacity(),
        }
    }
}

/// One model identifier, optionally on its own endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelEndpointConfig {
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Generative-text provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GenerativeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// API key; prefer `KINMATCH_GENERATIVE_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_generative_base_url")]
    pub base_url: String,
    /// Models tried in order before falling back to deterministic analysis
    #[serde(default = "default_models")]
    pub models: Vec<ModelEndpointConfig>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generative_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: default_generative_base_url(),
            models: default_models(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generative_timeout_secs(),
        }
    }
}

/// Per-source provider toggles and endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub familysearch: FamilySearchConfig,
    #[serde(default)]
    pub wikitree: WikiTreeConfig,
    #[serde(default)]
    pub chronicling_america: ChroniclingAmericaConfig,
    #[serde(default)]
    pub findagrave: ToggleConfig,
    #[serde(default)]
    pub ancestry: ToggleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilySearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Client id; prefer `KINMATCH_FAMILYSEARCH_CLIENT_ID`
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_familysearch_base_url")]
    pub base_url: String,
    #[serde(default = "default_familysearch_auth_url")]
    pub auth_url: String,
}

impl Default for FamilySearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            client_id: None,
            base_url: default_familysearch_base_url(),
            auth_url: default_familysearch_auth_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WikiTreeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_wikitree_app_id")]
    pub app_id: String,
    #[serde(default = "default_wikitree_base_url")]
    pub base_url: String,
}

impl Default for WikiTreeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_id: default_wikitree_app_id(),
            base_url: default_wikitree_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChroniclingAmericaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_chronicling_america_base_url")]
    pub base_url: String,
    /// Result rows requested per query
    #[serde(default = "default_rows")]
    pub rows: u32,
}

impl Default for ChroniclingAmericaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_chronicling_america_base_url(),
            rows: default_rows(),
        }
    }
}

/// Toggle for sources without a public API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleConfig {
    #[serde(default)]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_name_variants() -> usize {
    5
}

fn default_max_location_variants() -> usize {
    3
}

fn default_max_total_requests() -> usize {
    25
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_overall_deadline_secs() -> u64 {
    90
}

fn default_ledger_capacity() -> usize {
    1000
}

fn default_generative_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_models() -> Vec<ModelEndpointConfig> {
    ["gpt-4o-mini", "gpt-4o", "gpt-3.5-turbo"]
        .into_iter()
        .map(|model| ModelEndpointConfig {
            model: model.to_string(),
            base_url: None,
        })
        .collect()
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_temperature() -> f32 {
    0.2
}

fn default_generative_timeout_secs() -> u64 {
    45
}

fn default_familysearch_base_url() -> String {
    "https://api.familysearch.org".to_string()
}

fn default_familysearch_auth_url() -> String {
    "https://ident.familysearch.org/cis-web/oauth2/v3/token".to_string()
}

fn default_wikitree_app_id() -> String {
    "kinmatch".to_string()
}

fn default_wikitree_base_url() -> String {
    "https://api.wikitree.com/api.php".to_string()
}

fn default_chronicling_america_base_url() -> String {
    "https://chroniclingamerica.loc.gov".to_string()
}

fn default_rows() -> u32 {
    20
}

impl TomlConfig {
    /// Resolve the config path and load it, falling back to defaults
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration");
                load_toml_config(&path)
            }
            None => {
                info!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// SQLite path for the rejection ledger
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Resolve config file path: CLI → ENV → user config dir
///
/// An explicit CLI or ENV path is returned even if missing so the caller
/// reports the error; the user config dir is only used when the file exists.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("kinmatch").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &TomlConfig) -> Result<()> {
    if config.ledger.capacity == 0 {
        return Err(Error::Config("ledger.capacity must be at least 1".to_string()));
    }
    if config.search.max_total_requests == 0 {
        return Err(Error::Config(
            "search.max_total_requests must be at least 1".to_string(),
        ));
    }
    if config.generative.enabled && config.generative.models.is_empty() {
        return Err(Error::Config(
            "generative.models must list at least one model when generative is enabled".to_string(),
        ));
    }
    Ok(())
}

/// OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("kinmatch"))
        .unwrap_or_else(|| PathBuf::from("./kinmatch_data"))
        .join("kinmatch.db")
}

/// Resolve the generative API key: ENV → TOML
pub fn resolve_generative_api_key(config: &TomlConfig) -> Option<String> {
    resolve_secret(
        GENERATIVE_API_KEY_ENV_VAR,
        config.generative.api_key.as_deref(),
        "generative API key",
    )
}

/// Resolve the FamilySearch client id: ENV → TOML
pub fn resolve_familysearch_client_id(config: &TomlConfig) -> Option<String> {
    resolve_secret(
        FAMILYSEARCH_CLIENT_ID_ENV_VAR,
        config.providers.familysearch.client_id.as_deref(),
        "FamilySearch client id",
    )
}

fn resolve_secret(env_var: &str, toml_value: Option<&str>, label: &str) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment and TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Some(value);
    }
    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", label);
        return Some(value.to_string());
    }
    None
}

/// Validate a secret (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
