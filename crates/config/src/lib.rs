//! Configuration loading, validation, and management for ScopePilot.
//!
//! Loads configuration from `~/.scopepilot/config.toml` with environment
//! variable overrides. Validated once at startup, then shared read-only with
//! every component.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.scopepilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Chat ↔ tool round trips allowed per turn
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,

    /// Remote row store (Supabase)
    #[serde(default)]
    pub store: StoreConfig,

    /// Quote pricing defaults
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Provider party details printed on drafted agreements
    #[serde(default)]
    pub drafting: DraftingConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_max_tool_iterations() -> u32 {
    25
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("max_tool_iterations", &self.max_tool_iterations)
            .field("store", &self.store)
            .field("pricing", &self.pricing)
            .field("drafting", &self.drafting)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("service_key", &redact(&self.service_key))
            .field("timeout_secs", &self.timeout_secs)
            .field("exemplar_bucket", &self.exemplar_bucket)
            .finish()
    }
}

/// Supabase project the copilot reads and writes through PostgREST.
///
/// Either credential missing means the store is unavailable: reads come back
/// empty and writes are refused.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Service-role key, sent as both `apikey` and bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_key: Option<String>,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Storage bucket holding exemplar contract files
    #[serde(default = "default_exemplar_bucket")]
    pub exemplar_bucket: String,
}

fn default_store_timeout() -> u64 {
    10
}
fn default_exemplar_bucket() -> String {
    "policy-exemplars".into()
}

impl StoreConfig {
    pub fn is_configured(&self) -> bool {
        non_blank(&self.url).is_some() && non_blank(&self.service_key).is_some()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> Option<&str> {
        non_blank(&self.url).map(|u| u.trim_end_matches('/'))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            timeout_secs: default_store_timeout(),
            exemplar_bucket: default_exemplar_bucket(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Hourly rate for roles with no quote rate and no override
    #[serde(default = "default_role_rate")]
    pub default_role_rate: f64,

    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_role_rate() -> f64 {
    150.0
}
fn default_currency() -> String {
    "USD".into()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_role_rate: default_role_rate(),
            default_currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftingConfig {
    #[serde(default = "default_legal_name")]
    pub provider_legal_name: String,

    /// Defined-term name used throughout the documents (e.g. "VBT")
    #[serde(default = "default_short_name")]
    pub provider_short_name: String,

    #[serde(default = "default_entity")]
    pub provider_entity: String,

    #[serde(default = "default_address")]
    pub provider_address: String,

    #[serde(default = "default_governing_law")]
    pub governing_law: String,

    /// How the general-purpose prompt names the product
    #[serde(default = "default_platform_name")]
    pub platform_name: String,
}

fn default_legal_name() -> String {
    "Very Big Things, LLC".into()
}
fn default_short_name() -> String {
    "VBT".into()
}
fn default_entity() -> String {
    "a Florida limited liability company".into()
}
fn default_address() -> String {
    "837 Northeast 2nd Avenue, Fort Lauderdale, FL 33304".into()
}
fn default_governing_law() -> String {
    "the State of Delaware".into()
}
fn default_platform_name() -> String {
    "VBT estimation and contracts platform".into()
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            provider_legal_name: default_legal_name(),
            provider_short_name: default_short_name(),
            provider_entity: default_entity(),
            provider_address: default_address(),
            governing_law: default_governing_law(),
            platform_name: default_platform_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origins allowed by CORS. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.scopepilot/config.toml).
    ///
    /// Environment variables fill in what the file leaves out:
    /// - `SCOPEPILOT_API_KEY`, then `OPENAI_API_KEY`
    /// - `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`
    ///
    /// and `SCOPEPILOT_PROVIDER` / `SCOPEPILOT_MODEL` always win.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = lookup("SCOPEPILOT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("SCOPEPILOT_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("SCOPEPILOT_MODEL") {
            self.default_model = model;
        }
        if non_blank(&self.store.url).is_none() {
            self.store.url = lookup("SUPABASE_URL");
        }
        if non_blank(&self.store.service_key).is_none() {
            self.store.service_key = lookup("SUPABASE_SERVICE_ROLE_KEY");
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs_home().join(".scopepilot")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "max_tool_iterations must be at least 1".into(),
            ));
        }

        if self.store.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "store.timeout_secs must be > 0".into(),
            ));
        }

        if !self.pricing.default_role_rate.is_finite() || self.pricing.default_role_rate < 0.0 {
            return Err(ConfigError::ValidationError(
                "pricing.default_role_rate must be a non-negative number".into(),
            ));
        }

        if let Some(url) = self.store.base_url() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "store.url must be an http(s) URL, got '{url}'"
                )));
            }
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            max_tool_iterations: default_max_tool_iterations(),
            store: StoreConfig::default(),
            pricing: PricingConfig::default(),
            drafting: DraftingConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
