//! Common types for routed and validated calls

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{LLMError, Result};

/// Vendor kind for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Vendor {
    /// OpenAI chat completions
    OpenAI,
    /// Anthropic messages API
    Anthropic,
    /// Google Gemini generateContent
    Gemini,
}

impl Vendor {
    /// Vendors allowed for validated calls
    pub const ALL: [Vendor; 3] = [Vendor::OpenAI, Vendor::Anthropic, Vendor::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
        }
    }
}

impl FromStr for Vendor {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            _ => Err(LLMError::UnsupportedVendor {
                vendor: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role classification of a catalog model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    /// Primary answer generation
    High,
    /// Cheap verification
    Budget,
    Reasoning,
    /// Not used by validated calls
    #[serde(rename = "none")]
    Unclassified,
}

impl FromStr for ModelRole {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(Self::High),
            "budget" => Ok(Self::Budget),
            "reasoning" => Ok(Self::Reasoning),
            "none" => Ok(Self::Unclassified),
            other => Err(LLMError::invalid_config(format!(
                "unknown model type '{}' (expected high, budget, reasoning or none)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Budget => write!(f, "budget"),
            Self::Reasoning => write!(f, "reasoning"),
            Self::Unclassified => write!(f, "none"),
        }
    }
}

/// Why the provider stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Length,
    Other,
}

impl FinishReason {
    /// Map a provider's stop marker onto the common set.
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "stop" | "end_turn" | "stop_sequence" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A single chat-style request addressed by catalog model name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Catalog model name (not the vendor id)
    pub model_name: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Temperature (0.0-2.0)
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether to price the call
    #[serde(default)]
    pub cost_tracking: bool,
}

impl CallRequest {
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const MAX_TEMPERATURE: f32 = 2.0;

    pub fn new(model_name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            prompt: prompt.into(),
            system_message: None,
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: None,
            cost_tracking: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_message = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_cost_tracking(mut self, cost_tracking: bool) -> Self {
        self.cost_tracking = cost_tracking;
        self
    }

    /// System message to send; an empty one counts as absent.
    pub fn system(&self) -> Option<&str> {
        self.system_message.as_deref().filter(|s| !s.is_empty())
    }

    /// Output token limit to send; zero counts as absent.
    pub fn output_limit(&self) -> Option<u32> {
        self.max_tokens.filter(|&n| n > 0)
    }

    /// Prompt text as the vendor sees it, for usage estimates.
    pub(crate) fn estimation_text(&self) -> String {
        match self.system() {
            Some(system) => format!("{}\n{}", system, self.prompt),
            None => self.prompt.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=Self::MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(LLMError::InvalidRequest {
                message: format!(
                    "temperature {} outside [0, {}]",
                    self.temperature,
                    Self::MAX_TEMPERATURE
                ),
            });
        }
        Ok(())
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Counts came from the chars/4 heuristic, not the provider
    #[serde(default)]
    pub estimated: bool,
}

impl TokenUsage {
    pub fn reported(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            estimated: false,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Normalized reply from any vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub response_text: String,
    /// Vendor model id that actually served the call
    pub model_used: String,
    pub finish_reason: FinishReason,
    #[serde(default)]
    pub usage: TokenUsage,
    /// Present iff cost tracking was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// Result of `simple_call`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleCallResult {
    pub prompt: String,
    pub response: String,
    pub model_used: String,
    pub finish_reason: FinishReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// Terminal status of a validated call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Validated,
    ValidationFailed,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validated => write!(f, "validated"),
            Self::ValidationFailed => write!(f, "validation_failed"),
        }
    }
}

/// Result of `checked_call`
///
/// `ValidationFailed` is a normal outcome; callers must check `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub prompt: String,
    /// Verified answer, or a diagnostic message when validation failed
    pub response: String,
    /// High model plus the budget model that verified it
    pub model_label: String,
    pub status: ValidationStatus,
    /// Always within 1..=5
    pub attempts_used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
}

impl ValidationResult {
    pub fn is_validated(&self) -> bool {
        self.status == ValidationStatus::Validated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_parsing() {
        assert_eq!("Gemini".parse::<Vendor>().unwrap(), Vendor::Gemini);
        assert_eq!("google".parse::<Vendor>().unwrap(), Vendor::Gemini);
        assert_eq!("claude".parse::<Vendor>().unwrap(), Vendor::Anthropic);
        assert_eq!("OPENAI".parse::<Vendor>().unwrap(), Vendor::OpenAI);
        assert!(matches!(
            "DeepSeek".parse::<Vendor>(),
            Err(LLMError::UnsupportedVendor { vendor }) if vendor == "DeepSeek"
        ));
    }

    #[test]
    fn test_vendor_serde_uses_catalog_names() {
        assert_eq!(serde_json::to_string(&Vendor::OpenAI).unwrap(), "\"OpenAI\"");
        let vendor: Vendor = serde_json::from_str("\"Anthropic\"").unwrap();
        assert_eq!(vendor, Vendor::Anthropic);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("budget".parse::<ModelRole>().unwrap(), ModelRole::Budget);
        assert_eq!("none".parse::<ModelRole>().unwrap(), ModelRole::Unclassified);
        assert!("premium".parse::<ModelRole>().is_err());
        assert_eq!(ModelRole::Unclassified.to_string(), "none");
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_provider("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("end_turn"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("STOP"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("length"), FinishReason::Length);
        assert_eq!(FinishReason::from_provider("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(FinishReason::from_provider("SAFETY"), FinishReason::Other);
    }

    #[test]
    fn test_request_validation() {
        let request = CallRequest::new("gpt4o", "Hello");
        assert_eq!(request.temperature, 0.7);
        assert!(request.validate().is_ok());

        assert!(request.clone().with_temperature(2.0).validate().is_ok());
        assert!(request.clone().with_temperature(0.0).validate().is_ok());
        assert!(request.clone().with_temperature(2.1).validate().is_err());
        assert!(request.clone().with_temperature(-0.1).validate().is_err());
        assert!(request.clone().with_temperature(f32::NAN).validate().is_err());
        // zero is treated as "no limit", not rejected
        assert!(request.with_max_tokens(0).validate().is_ok());
    }

    #[test]
    fn test_empty_system_and_zero_limit_are_absent() {
        let request = CallRequest::new("gpt4o", "Hello").with_system("").with_max_tokens(0);
        assert_eq!(request.system(), None);
        assert_eq!(request.output_limit(), None);
        assert_eq!(request.estimation_text(), "Hello");

        let request = CallRequest::new("gpt4o", "Hello").with_system("Be terse").with_max_tokens(32);
        assert_eq!(request.system(), Some("Be terse"));
        assert_eq!(request.output_limit(), Some(32));
        assert_eq!(request.estimation_text(), "Be terse\nHello");
    }

    #[test]
    fn test_validation_status_serde() {
        let json = serde_json::to_string(&ValidationStatus::ValidationFailed).unwrap();
        assert_eq!(json, "\"validation_failed\"");
    }
}
