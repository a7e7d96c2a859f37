//! Runtime configuration: `lunchbox.toml` plus environment overrides.
//!
//! Precedence, highest first:
//! 1. CLI flags (applied by the binary)
//! 2. Environment variables, `LUNCHBOX_{SECTION}_{FIELD}` (e.g. `LUNCHBOX_STORE_PATH`)
//! 3. The config file
//! 4. Defaults
//!
//! API keys additionally fall back to `GEMINI_API_KEY` and `OPENROUTER_API_KEY`.
//!
//! ```no_run
//! use lunchbox_core::config::LunchboxConfig;
//!
//! let config = LunchboxConfig::load("lunchbox.toml")?;
//! # Ok::<(), lunchbox_core::ConfigError>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LunchboxConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub carbon: CarbonConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub recipes: RecipesConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

impl LunchboxConfig {
    /// Load from `path`, apply environment overrides and validate.
    ///
    /// A missing file is not an error: defaults are used.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing sections and fields take defaults.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        override_string(&mut self.general.log_level, var("LUNCHBOX_GENERAL_LOG_LEVEL"));
        override_string(&mut self.general.log_format, var("LUNCHBOX_GENERAL_LOG_FORMAT"));
        override_string(&mut self.general.user, var("LUNCHBOX_GENERAL_USER"));

        if let Some(raw) = var("LUNCHBOX_STORE_BACKEND") {
            match StoreBackend::parse(&raw) {
                Some(backend) => self.store.backend = backend,
                None => warn!(value = %raw, "ignoring unknown LUNCHBOX_STORE_BACKEND"),
            }
        }
        override_string(&mut self.store.path, var("LUNCHBOX_STORE_PATH"));

        if let Some(path) = var("LUNCHBOX_CARBON_TABLE_PATH") {
            self.carbon.table_path = Some(path);
        }

        override_string(&mut self.analyzer.base_url, var("LUNCHBOX_ANALYZER_BASE_URL"));
        override_string(&mut self.analyzer.model, var("LUNCHBOX_ANALYZER_MODEL"));
        override_string(&mut self.analyzer.api_key, var("LUNCHBOX_ANALYZER_API_KEY"));
        if self.analyzer.api_key.is_empty() {
            override_string(&mut self.analyzer.api_key, var("GEMINI_API_KEY"));
        }
        override_u64(
            &mut self.analyzer.timeout_secs,
            "LUNCHBOX_ANALYZER_TIMEOUT_SECS",
            var("LUNCHBOX_ANALYZER_TIMEOUT_SECS"),
        );

        override_string(
            &mut self.recipes.fallback_base_url,
            var("LUNCHBOX_RECIPES_FALLBACK_BASE_URL"),
        );
        override_string(
            &mut self.recipes.fallback_model,
            var("LUNCHBOX_RECIPES_FALLBACK_MODEL"),
        );
        override_string(
            &mut self.recipes.fallback_api_key,
            var("LUNCHBOX_RECIPES_FALLBACK_API_KEY"),
        );
        if self.recipes.fallback_api_key.is_empty() {
            override_string(&mut self.recipes.fallback_api_key, var("OPENROUTER_API_KEY"));
        }

        override_string(&mut self.lookup.base_url, var("LUNCHBOX_LOOKUP_BASE_URL"));
        override_u64(
            &mut self.lookup.timeout_secs,
            "LUNCHBOX_LOOKUP_TIMEOUT_SECS",
            var("LUNCHBOX_LOOKUP_TIMEOUT_SECS"),
        );
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", LEVELS.join(", ")),
            ));
        }
        if !["pretty", "json"].contains(&self.general.log_format.as_str()) {
            return Err(invalid("general.log_format", "must be 'pretty' or 'json'"));
        }
        if self.general.user.trim().is_empty() {
            return Err(invalid("general.user", "must not be empty"));
        }
        if self.store.backend == StoreBackend::DuckDb && self.store.path.trim().is_empty() {
            return Err(invalid("store.path", "required for the duckdb backend"));
        }
        for (field, url) in [
            ("analyzer.base_url", &self.analyzer.base_url),
            ("recipes.fallback_base_url", &self.recipes.fallback_base_url),
            ("lookup.base_url", &self.lookup.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(field, "must be an http(s) URL"));
            }
        }
        if self.analyzer.timeout_secs == 0 {
            return Err(invalid("analyzer.timeout_secs", "must be greater than 0"));
        }
        if self.lookup.timeout_secs == 0 {
            return Err(invalid("lookup.timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    /// `pretty` or `json`.
    pub log_format: String,
    /// User whose ledger and history the CLI operates on.
    pub user: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            user: "default".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local; nothing survives a restart.
    Memory,
    #[default]
    #[serde(rename = "duckdb")]
    DuckDb,
}

impl StoreBackend {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "duckdb" => Some(Self::DuckDb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file for the duckdb backend.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::DuckDb,
            path: "lunchbox.duckdb".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonConfig {
    /// JSON table replacing the built-in one.
    pub table_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_owned(),
            model: "gemini-2.5-flash-preview-05-20".to_owned(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipesConfig {
    pub fallback_base_url: String,
    pub fallback_model: String,
    pub fallback_api_key: String,
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            fallback_base_url: "https://openrouter.ai/api/v1".to_owned(),
            fallback_model: "google/gemini-2.5-flash-preview".to_owned(),
            fallback_api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://world.openfoodfacts.org".to_owned(),
            timeout_secs: 15,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

fn override_string(field: &mut String, value: Option<String>) {
    if let Some(v) = value {
        *field = v;
    }
}

fn override_u64(field: &mut u64, key: &str, value: Option<String>) {
    if let Some(raw) = value {
        match raw.trim().parse() {
            Ok(v) => *field = v,
            Err(_) => warn!(key, value = %raw, "ignoring non-numeric override"),
        }
    }
}
