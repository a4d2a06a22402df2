//! Google Gemini generateContent adapter
//!
//! Gemini gets a single prompt; a system message is inlined as a
//! `[System: ...]` prefix, which changes the prompt text the model sees.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Span;

use super::{usage_or_estimate, AdapterSettings, CallContext, VendorAdapter};
use crate::error::Result;
use crate::registry::ModelDescriptor;
use crate::types::*;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini API adapter
pub struct GeminiAdapter {
    settings: AdapterSettings,
    client: reqwest::Client,
    span: Span,
}

impl GeminiAdapter {
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
pub(crate) struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: Option<u32>,
}

/// The prompt Gemini actually receives. An empty system message adds nothing.
pub fn inline_system_prompt(prompt: &str, system_message: Option<&str>) -> String {
    match system_message.filter(|s| !s.is_empty()) {
        Some(system) => format!("[System: {}]\n\n{}", system, prompt),
        None => prompt.to_string(),
    }
}

pub(crate) fn build_generate_request(full_prompt: &str, request: &CallRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: Some(full_prompt.to_string()),
            }],
        }],
        generation_config: GeminiGenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.output_limit(),
        },
    }
}

#[async_trait]
impl VendorAdapter for GeminiAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Gemini
    }

    async fn call(&self, model: &ModelDescriptor, request: &CallRequest) -> Result<CallResult> {
        let ctx = CallContext::new(Vendor::Gemini, model, &self.span)?;
        let full_prompt = inline_system_prompt(&request.prompt, request.system());
        let generate_request = build_generate_request(&full_prompt, request);

        let path = format!("/v1beta/models/{}:generateContent", model.vendor_model_id);
        let response: GeminiResponse = ctx
            .send_json(
                self.client
                    .post(self.settings.endpoint(&path))
                    .header("x-goog-api-key", &self.settings.api_key)
                    .json(&generate_request),
            )
            .await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ctx.failed("response contained no candidates"))?;

        // Blocked candidates (SAFETY, RECITATION) carry no parts.
        let texts: Vec<String> = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if texts.is_empty() {
            return Err(ctx.failed("response contained no text content"));
        }
        let content = texts.concat();

        // Gemini may omit the finish reason; treat that as a normal stop.
        let finish_reason = candidate
            .finish_reason
            .as_deref()
            .map(FinishReason::from_provider)
            .unwrap_or(FinishReason::Stop);

        let reported = response.usage_metadata.and_then(|u| {
            Some((u.prompt_token_count?, u.candidates_token_count?))
        });
        let usage = usage_or_estimate(reported, &full_prompt, &content);

        Ok(ctx.finish(request, content, finish_reason, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_message_inlined() {
        assert_eq!(
            inline_system_prompt("Tell me a joke", Some("Be brief")),
            "[System: Be brief]\n\nTell me a joke"
        );
        assert_eq!(inline_system_prompt("Tell me a joke", None), "Tell me a joke");
        assert_eq!(inline_system_prompt("Tell me a joke", Some("")), "Tell me a joke");
    }

    #[test]
    fn test_generation_config() {
        let request = CallRequest::new("gemini25flash", "Hi").with_max_tokens(256);
        let body = serde_json::to_value(build_generate_request("Hi", &request)).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hi");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_zero_limit_omitted() {
        let request = CallRequest::new("gemini25flash", "Hi").with_max_tokens(0);
        let body = serde_json::to_value(build_generate_request("Hi", &request)).unwrap();

        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }
}
