//! Error taxonomy for routed and validated calls
//!
//! Configuration errors are fatal and never retried. Call failures are only
//! retried by the validation loop moving on to its next attempt.

use thiserror::Error;

use crate::types::{ModelRole, Vendor};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    #[error("Model '{model}' not found in configuration")]
    UnknownModel { model: String },

    #[error("Vendor '{vendor}' not supported or adapter not registered")]
    UnsupportedVendor { vendor: String },

    #[error("No {role} model found for vendor: {vendor}")]
    MissingRoleModel { vendor: Vendor, role: ModelRole },

    #[error("{vendor} API call failed for '{model}': {message}")]
    VendorCallFailed {
        vendor: Vendor,
        model: String,
        message: String,
    },

    #[error("API call failed for model '{model}' (vendor: {vendor}): {source}")]
    RoutedCallFailed {
        model: String,
        vendor: Vendor,
        #[source]
        source: Box<LLMError>,
    },

    #[error("Validated call for {vendor} aborted on attempt {attempt}: {source}")]
    ValidationAborted {
        vendor: Vendor,
        attempt: u32,
        #[source]
        source: Box<LLMError>,
    },

    #[error("{variable} not set (required for {vendor})")]
    MissingCredential { vendor: Vendor, variable: String },

    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

pub type Result<T> = std::result::Result<T, LLMError>;

impl LLMError {
    /// Errors caused by the catalog, credentials or settings.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownModel { .. }
                | Self::UnsupportedVendor { .. }
                | Self::MissingRoleModel { .. }
                | Self::MissingCredential { .. }
                | Self::InvalidConfig { .. }
        )
    }

    /// Provider-layer failures the validation loop absorbs on non-final attempts.
    pub fn is_call_failure(&self) -> bool {
        matches!(
            self,
            Self::VendorCallFailed { .. } | Self::RoutedCallFailed { .. }
        )
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for LLMError {
    fn from(e: config::ConfigError) -> Self {
        LLMError::InvalidConfig {
            message: e.to_string(),
        }
    }
}
