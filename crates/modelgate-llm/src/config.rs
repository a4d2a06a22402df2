//! Gateway Configuration
//!
//! Layered loading: `config/default`, `config/local`, an optional explicit
//! file, then `MODELGATE__*` environment variables. Every section has
//! defaults, so an empty configuration is valid.
//!
//! API keys are never stored here; only the names of the environment
//! variables holding them. Keys are read when adapters are built, and a
//! missing key is a startup error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;

use crate::error::{LLMError, Result};
use crate::providers::*;
use crate::registry::ModelRegistry;
use crate::types::{CallRequest, Vendor};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Model catalog source
    #[serde(default)]
    pub models: ModelsConfig,

    /// Per-vendor endpoints and credential variables
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Call defaults
    #[serde(default)]
    pub request: RequestSettings,

    /// Validated call behaviour
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dotenv-style file loaded before credentials are resolved
    #[serde(default = "default_secrets_file")]
    pub secrets_file: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            providers: ProvidersConfig::default(),
            request: RequestSettings::default(),
            validation: ValidationConfig::default(),
            logging: LoggingConfig::default(),
            secrets_file: default_secrets_file(),
        }
    }
}

/// Model catalog source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// JSON catalog path; the built-in catalog when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl ModelsConfig {
    pub fn load_registry(&self) -> Result<ModelRegistry> {
        match self.catalog_path {
            Some(ref path) => ModelRegistry::from_path(path),
            None => ModelRegistry::builtin(),
        }
    }
}

/// Settings for a single vendor; unset fields fall back to vendor defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Anthropic `anthropic-version` header
    #[serde(default)]
    pub api_version: Option<String>,

    /// Anthropic max_tokens when the request sets none
    #[serde(default)]
    pub default_max_tokens: Option<u32>,
}

/// Vendor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub gemini: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, vendor: Vendor) -> &ProviderConfig {
        match vendor {
            Vendor::OpenAI => &self.openai,
            Vendor::Anthropic => &self.anthropic,
            Vendor::Gemini => &self.gemini,
        }
    }

    pub fn base_url(&self, vendor: Vendor) -> String {
        let fallback = match vendor {
            Vendor::OpenAI => OPENAI_BASE_URL,
            Vendor::Anthropic => ANTHROPIC_BASE_URL,
            Vendor::Gemini => GEMINI_BASE_URL,
        };
        self.get(vendor)
            .base_url
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn api_key_env(&self, vendor: Vendor) -> String {
        let fallback = match vendor {
            Vendor::OpenAI => "OPENAI_KEY",
            Vendor::Anthropic => "ANTHROPIC_KEY",
            Vendor::Gemini => "GEMINI_KEY",
        };
        self.get(vendor)
            .api_key_env
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Call defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSettings {
    /// Per-call transport timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
        }
    }
}

impl RequestSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Validated call behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Issue the three samples of an attempt concurrently
    #[serde(default = "default_true")]
    pub concurrent_samples: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            concurrent_samples: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_secrets_file() -> Option<PathBuf> {
    Some(PathBuf::from("secrets.env"))
}

fn default_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    CallRequest::DEFAULT_TEMPERATURE
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl GatewayConfig {
    /// Load configuration from default locations, an optional file and the environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MODELGATE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let gateway_config: GatewayConfig = builder.build()?.try_deserialize()?;
        gateway_config.validate()?;
        Ok(gateway_config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=CallRequest::MAX_TEMPERATURE).contains(&self.request.temperature) {
            return Err(LLMError::invalid_config(format!(
                "request.temperature {} outside [0, {}]",
                self.request.temperature,
                CallRequest::MAX_TEMPERATURE
            )));
        }
        if self.request.timeout_secs == 0 {
            return Err(LLMError::invalid_config("request.timeout_secs must be positive"));
        }
        if self.providers.anthropic.default_max_tokens == Some(0) {
            return Err(LLMError::invalid_config(
                "providers.anthropic.default_max_tokens must be positive",
            ));
        }
        Ok(())
    }

    /// Load the secrets file (if present) and `.env` into the process environment.
    pub fn load_secrets(&self) -> Result<()> {
        if let Some(ref path) = self.secrets_file {
            match dotenvy::from_path(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Loaded secrets file"),
                Err(e) if e.not_found() => {}
                Err(e) => {
                    return Err(LLMError::invalid_config(format!(
                        "cannot load secrets file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        let _ = dotenvy::dotenv();
        Ok(())
    }

    /// Resolve endpoint and API key for `vendor` from the environment.
    pub fn adapter_settings(&self, vendor: Vendor) -> Result<AdapterSettings> {
        let variable = self.providers.api_key_env(vendor);
        let api_key = match std::env::var(&variable) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                tracing::error!(vendor = %vendor, variable = %variable, "API key not found");
                return Err(LLMError::MissingCredential { vendor, variable });
            }
        };

        Ok(AdapterSettings::new(api_key, self.providers.base_url(vendor))
            .with_timeout(self.request.timeout()))
    }

    /// Build the adapter for `vendor`, applying vendor-specific options.
    pub fn build_adapter(&self, vendor: Vendor, span: Span) -> Result<Arc<dyn VendorAdapter>> {
        let settings = self.adapter_settings(vendor)?;
        if vendor != Vendor::Anthropic {
            return adapter_for(vendor, settings, span);
        }

        let options = &self.providers.anthropic;
        let mut adapter = AnthropicAdapter::new(settings)?.with_span(span);
        if let Some(ref version) = options.api_version {
            adapter = adapter.with_api_version(version.clone());
        }
        if let Some(max_tokens) = options.default_max_tokens {
            adapter = adapter.with_default_max_tokens(max_tokens);
        }
        Ok(Arc::new(adapter))
    }
}
