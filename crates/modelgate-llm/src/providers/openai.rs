//! OpenAI chat completions adapter

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Span;

use super::{usage_or_estimate, AdapterSettings, CallContext, VendorAdapter};
use crate::error::Result;
use crate::registry::ModelDescriptor;
use crate::types::*;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI API adapter
pub struct OpenAIAdapter {
    settings: AdapterSettings,
    client: reqwest::Client,
    span: Span,
}

impl OpenAIAdapter {
    pub fn new(settings: AdapterSettings) -> Result<Self> {
        let client = settings.http_client()?;
        Ok(Self {
            settings,
            client,
            span: Span::none(),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChatChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChatChoice {
    message: OpenAIChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Message-array request: optional system message, then the user prompt.
pub(crate) fn build_chat_request(model: &ModelDescriptor, request: &CallRequest) -> OpenAIChatRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system() {
        messages.push(OpenAIChatMessage {
            role: "system".to_string(),
            content: Some(system.to_string()),
        });
    }
    messages.push(OpenAIChatMessage {
        role: "user".to_string(),
        content: Some(request.prompt.clone()),
    });

    OpenAIChatRequest {
        model: model.vendor_model_id.clone(),
        messages,
        temperature: request.temperature,
        max_tokens: request.output_limit(),
    }
}

#[async_trait]
impl VendorAdapter for OpenAIAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::OpenAI
    }

    async fn call(&self, model: &ModelDescriptor, request: &CallRequest) -> Result<CallResult> {
        let ctx = CallContext::new(Vendor::OpenAI, model, &self.span)?;
        let chat_request = build_chat_request(model, request);

        let chat_response: OpenAIChatResponse = ctx
            .send_json(
                self.client
                    .post(self.settings.endpoint("/v1/chat/completions"))
                    .bearer_auth(&self.settings.api_key)
                    .json(&chat_request),
            )
            .await?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ctx.failed("response contained no choices"))?;

        // A filtered reply has no content at all; that is not an empty answer.
        let content = choice
            .message
            .content
            .ok_or_else(|| ctx.failed("response contained no text content"))?;
        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_provider)
            .unwrap_or(FinishReason::Other);

        let usage = usage_or_estimate(
            chat_response
                .usage
                .map(|u| (u.prompt_tokens, u.completion_tokens)),
            &request.estimation_text(),
            &content,
        );

        Ok(ctx.finish(request, content, finish_reason, usage))
    }
}
