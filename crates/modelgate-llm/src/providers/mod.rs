//! Vendor adapters
//!
//! Each adapter turns a [`CallRequest`] into one call against its vendor's API
//! and normalizes the reply into a [`CallResult`]. Adapters never retry;
//! every provider failure comes back as [`LLMError::VendorCallFailed`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;

use crate::cost;
use crate::error::{LLMError, Result};
use crate::registry::ModelDescriptor;
use crate::types::*;

mod anthropic;
mod gemini;
mod openai;

pub use anthropic::*;
pub use gemini::*;
pub use openai::*;

/// Trait implemented once per vendor
#[async_trait]
pub trait VendorAdapter: Send + Sync {
    /// The vendor this adapter speaks to
    fn vendor(&self) -> Vendor;

    /// Issue a single call for `model`.
    async fn call(&self, model: &ModelDescriptor, request: &CallRequest) -> Result<CallResult>;
}

/// Connection settings shared by every adapter
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub api_key: String,
    /// Scheme and host, without the API path
    pub base_url: String,
    /// Per-call timeout; a hung call fails instead of blocking the caller
    pub timeout: Duration,
}

impl AdapterSettings {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LLMError::invalid_config(format!("cannot build HTTP client: {}", e)))
    }
}

/// Build the adapter for `vendor` with default vendor options.
pub fn adapter_for(vendor: Vendor, settings: AdapterSettings, span: Span) -> Result<Arc<dyn VendorAdapter>> {
    let adapter: Arc<dyn VendorAdapter> = match vendor {
        Vendor::OpenAI => Arc::new(OpenAIAdapter::new(settings)?.with_span(span)),
        Vendor::Anthropic => Arc::new(AnthropicAdapter::new(settings)?.with_span(span)),
        Vendor::Gemini => Arc::new(GeminiAdapter::new(settings)?.with_span(span)),
    };
    Ok(adapter)
}

/// Per-call context shared by the adapter implementations
pub(crate) struct CallContext<'a> {
    pub vendor: Vendor,
    pub model: &'a ModelDescriptor,
    pub span: &'a Span,
}

impl<'a> CallContext<'a> {
    pub fn new(vendor: Vendor, model: &'a ModelDescriptor, span: &'a Span) -> Result<Self> {
        if model.vendor != vendor {
            let e = LLMError::InvalidRequest {
                message: format!("model '{}' is not a {} model", model.name, vendor),
            };
            tracing::error!(parent: span, vendor = %vendor, model = %model.name, "{}", e);
            return Err(e);
        }
        Ok(Self { vendor, model, span })
    }

    /// Log and build the vendor failure for this call.
    pub fn failed(&self, message: impl Into<String>) -> LLMError {
        let message = message.into();
        tracing::error!(
            parent: self.span,
            vendor = %self.vendor,
            model = %self.model.vendor_model_id,
            "{} API call failed: {}",
            self.vendor,
            message
        );
        LLMError::VendorCallFailed {
            vendor: self.vendor,
            model: self.model.vendor_model_id.clone(),
            message,
        }
    }

    /// Send a JSON request and decode a JSON reply.
    pub async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| self.failed(format!("network error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.failed(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| self.failed(format!("malformed response: {}", e)))
    }

    /// Assemble the normalized result, pricing it when requested.
    pub fn finish(
        &self,
        request: &CallRequest,
        response_text: String,
        finish_reason: FinishReason,
        usage: TokenUsage,
    ) -> CallResult {
        let cost = cost::settle(self.model, &usage, request.cost_tracking, self.span);
        tracing::debug!(
            parent: self.span,
            model = %self.model.vendor_model_id,
            finish_reason = %finish_reason,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Call completed"
        );
        CallResult {
            response_text,
            model_used: self.model.vendor_model_id.clone(),
            finish_reason,
            usage,
            cost,
        }
    }
}

/// Usage as reported by the provider, or estimated from the texts.
pub(crate) fn usage_or_estimate(
    reported: Option<(u32, u32)>,
    prompt_text: &str,
    response_text: &str,
) -> TokenUsage {
    match reported {
        Some((input, output)) => TokenUsage::reported(input, output),
        None => TokenUsage {
            input_tokens: cost::estimate_tokens(prompt_text),
            output_tokens: cost::estimate_tokens(response_text),
            estimated: true,
        },
    }
}
