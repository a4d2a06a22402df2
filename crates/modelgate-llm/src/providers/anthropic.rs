//! Anthropic messages adapter

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Span;

use super::{usage_or_estimate, AdapterSettings, CallContext, VendorAdapter};
use crate::error::Result;
use crate::registry::ModelDescriptor;
use crate::types::*;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
/// The messages API requires max_tokens on every request
pub const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Claude API adapter
pub struct AnthropicAdapter {
    settings: AdapterSettings,
    client: reqwest::Client,
    api_version: String,
    default_max_tokens: u32,
    span: Span,
}

impl AnthropicAdapter {
    pub fn new(settings: AdapterSettings) -> Result<Self> {
        let client = settings.http_client()?;
        Ok(Self {
            settings,
            client,
            api_version: ANTHROPIC_API_VERSION.to_string(),
            default_max_tokens: ANTHROPIC_DEFAULT_MAX_TOKENS,
            span: Span::none(),
        })
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// System prompt travels in its own top-level field.
pub(crate) fn build_messages_request(
    model: &ModelDescriptor,
    request: &CallRequest,
    default_max_tokens: u32,
) -> AnthropicRequest {
    AnthropicRequest {
        model: model.vendor_model_id.clone(),
        max_tokens: request.output_limit().unwrap_or(default_max_tokens),
        system: request.system().map(str::to_string),
        messages: vec![AnthropicMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        }],
        temperature: request.temperature,
    }
}

#[async_trait]
impl VendorAdapter for AnthropicAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Anthropic
    }

    async fn call(&self, model: &ModelDescriptor, request: &CallRequest) -> Result<CallResult> {
        let ctx = CallContext::new(Vendor::Anthropic, model, &self.span)?;
        let messages_request = build_messages_request(model, request, self.default_max_tokens);

        let response: AnthropicResponse = ctx
            .send_json(
                self.client
                    .post(self.settings.endpoint("/v1/messages"))
                    .header("x-api-key", &self.settings.api_key)
                    .header("anthropic-version", &self.api_version)
                    .json(&messages_request),
            )
            .await?;

        let texts: Vec<String> = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if texts.is_empty() {
            return Err(ctx.failed("response contained no text content"));
        }
        let content = texts.concat();

        let finish_reason = response
            .stop_reason
            .as_deref()
            .map(FinishReason::from_provider)
            .unwrap_or(FinishReason::Other);

        let usage = usage_or_estimate(
            response.usage.map(|u| (u.input_tokens, u.output_tokens)),
            &request.estimation_text(),
            &content,
        );

        Ok(ctx.finish(request, content, finish_reason, usage))
    }
}
