use mockito::{Matcher, Server};
use serde_json::json;

use modelgate_llm::{
    AdapterSettings, AnthropicAdapter, CallRequest, FinishReason, GeminiAdapter, LLMError,
    ModelDescriptor, ModelRegistry, OpenAIAdapter, VendorAdapter, Vendor,
};

fn model(name: &str) -> ModelDescriptor {
    ModelRegistry::builtin()
        .unwrap()
        .get_by_name(name)
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "Be terse"},
                {"role": "user", "content": "What is 2+2?"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "4"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = OpenAIAdapter::new(AdapterSettings::new("sk-test", server.url())).unwrap();
    let request = CallRequest::new("gpt4omini", "What is 2+2?")
        .with_system("Be terse")
        .with_cost_tracking(true);
    let result = adapter.call(&model("gpt4omini"), &request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.response_text, "4");
    assert_eq!(result.model_used, "gpt-4o-mini");
    assert_eq!(result.finish_reason, FinishReason::Stop);
    assert_eq!(result.usage.input_tokens, 10);
    assert_eq!(result.usage.output_tokens, 5);
    assert!(!result.usage.estimated);
    let expected = 10.0 * 0.00000015 + 5.0 * 0.0000006;
    assert!((result.cost.unwrap() - expected).abs() < 1e-12);
}

#[tokio::test]
async fn test_openai_http_error_is_vendor_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let adapter = OpenAIAdapter::new(AdapterSettings::new("sk-test", server.url())).unwrap();
    let err = adapter
        .call(&model("gpt4o"), &CallRequest::new("gpt4o", "Hi"))
        .await
        .unwrap_err();

    match err {
        LLMError::VendorCallFailed { vendor, model, message } => {
            assert_eq!(vendor, Vendor::OpenAI);
            assert_eq!(model, "gpt-4o");
            assert!(message.contains("500"));
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_empty_choices_is_vendor_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(json!({"choices": []}).to_string())
        .create_async()
        .await;

    let adapter = OpenAIAdapter::new(AdapterSettings::new("sk-test", server.url())).unwrap();
    let err = adapter
        .call(&model("gpt4o"), &CallRequest::new("gpt4o", "Hi"))
        .await
        .unwrap_err();
    assert!(err.is_call_failure());
}

#[tokio::test]
async fn test_openai_filtered_reply_without_content_is_vendor_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(
            json!({
                "choices": [{
                    "message": {"role": "assistant"},
                    "finish_reason": "content_filter"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = OpenAIAdapter::new(AdapterSettings::new("sk-test", server.url())).unwrap();
    let err = adapter
        .call(&model("gpt4o"), &CallRequest::new("gpt4o", "Hi"))
        .await
        .unwrap_err();
    match err {
        LLMError::VendorCallFailed { vendor, message, .. } => {
            assert_eq!(vendor, Vendor::OpenAI);
            assert!(message.contains("no text content"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_empty_system_message_not_sent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Json(json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "Hello"}],
            "temperature": 0.5
        })))
        .with_status(200)
        .with_body(
            json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Hi"},
                    "finish_reason": "stop"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = OpenAIAdapter::new(AdapterSettings::new("sk-test", server.url())).unwrap();
    let request = CallRequest::new("gpt4o", "Hello")
        .with_system("")
        .with_temperature(0.5)
        .with_max_tokens(0);
    let result = adapter.call(&model("gpt4o"), &request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.response_text, "Hi");
}

#[tokio::test]
async fn test_anthropic_messages() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "ak-test")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({
            "model": "claude-3-haiku-20240307",
            "system": "You are a poet",
            "max_tokens": 4096,
            "messages": [{"role": "user", "content": "Write a haiku"}]
        })))
        .with_status(200)
        .with_body(
            json!({
                "content": [
                    {"type": "text", "text": "Autumn moonlight,"},
                    {"type": "text", "text": " a worm digs silently"}
                ],
                "stop_reason": "max_tokens",
                "usage": {"input_tokens": 12, "output_tokens": 9}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = AnthropicAdapter::new(AdapterSettings::new("ak-test", server.url())).unwrap();
    let request = CallRequest::new("claude3haiku", "Write a haiku").with_system("You are a poet");
    let result = adapter.call(&model("claude3haiku"), &request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.response_text, "Autumn moonlight, a worm digs silently");
    assert_eq!(result.finish_reason, FinishReason::Length);
    assert_eq!(result.usage.total(), 21);
    assert_eq!(result.cost, None);
}

#[tokio::test]
async fn test_anthropic_custom_version_and_max_tokens() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("anthropic-version", "2024-01-01")
        .match_body(Matcher::PartialJson(json!({"max_tokens": 512})))
        .with_status(200)
        .with_body(
            json!({
                "content": [{"type": "text", "text": "ok"}],
                "stop_reason": "end_turn"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = AnthropicAdapter::new(AdapterSettings::new("ak-test", server.url()))
        .unwrap()
        .with_api_version("2024-01-01")
        .with_default_max_tokens(512);
    let result = adapter
        .call(&model("claude3haiku"), &CallRequest::new("claude3haiku", "Hi"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.finish_reason, FinishReason::Stop);
    // No usage block: counts are estimated.
    assert!(result.usage.estimated);
}

#[tokio::test]
async fn test_gemini_inlines_system_and_estimates_usage() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
        .match_header("x-goog-api-key", "gk-test")
        .match_body(Matcher::PartialJson(json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": "[System: Be brief]\n\nTell me a joke"}]
            }]
        })))
        .with_status(200)
        .with_body(
            json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Why did the chicken cross the road?"}]}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = GeminiAdapter::new(AdapterSettings::new("gk-test", server.url())).unwrap();
    let request = CallRequest::new("gemini25flash", "Tell me a joke")
        .with_system("Be brief")
        .with_cost_tracking(true);
    let result = adapter.call(&model("gemini25flash"), &request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.response_text, "Why did the chicken cross the road?");
    assert_eq!(result.model_used, "gemini-2.5-flash");
    assert_eq!(result.finish_reason, FinishReason::Stop);
    assert!(result.usage.estimated);
    // 34 prompt chars and 35 response chars, four per token
    assert_eq!(result.usage.input_tokens, 8);
    assert_eq!(result.usage.output_tokens, 8);
    assert!(result.cost.unwrap() > 0.0);
}

#[tokio::test]
async fn test_gemini_reported_usage_wins() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
        .with_status(200)
        .with_body(
            json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Paris"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 1}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = GeminiAdapter::new(AdapterSettings::new("gk-test", server.url())).unwrap();
    let result = adapter
        .call(&model("gemini25pro"), &CallRequest::new("gemini25pro", "Capital of France?"))
        .await
        .unwrap();

    assert_eq!(result.usage.input_tokens, 7);
    assert_eq!(result.usage.output_tokens, 1);
    assert!(!result.usage.estimated);
}

#[tokio::test]
async fn test_gemini_no_candidates_is_vendor_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-pro:generateContent")
        .with_status(200)
        .with_body(json!({"candidates": []}).to_string())
        .create_async()
        .await;

    let adapter = GeminiAdapter::new(AdapterSettings::new("gk-test", server.url())).unwrap();
    let err = adapter
        .call(&model("gemini25pro"), &CallRequest::new("gemini25pro", "Hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LLMError::VendorCallFailed { vendor: Vendor::Gemini, .. }));
}

#[tokio::test]
async fn test_gemini_blocked_candidate_is_vendor_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
        .with_status(200)
        .with_body(json!({"candidates": [{"finishReason": "SAFETY"}]}).to_string())
        .create_async()
        .await;

    let adapter = GeminiAdapter::new(AdapterSettings::new("gk-test", server.url())).unwrap();
    let err = adapter
        .call(&model("gemini25flash"), &CallRequest::new("gemini25flash", "Hi"))
        .await
        .unwrap_err();
    match err {
        LLMError::VendorCallFailed { vendor, model, message } => {
            assert_eq!(vendor, Vendor::Gemini);
            assert_eq!(model, "gemini-2.5-flash");
            assert!(message.contains("no text content"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_gemini_empty_system_message_not_inlined() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
        .match_body(Matcher::PartialJson(json!({
            "contents": [{"role": "user", "parts": [{"text": "Tell me a joke"}]}]
        })))
        .with_status(200)
        .with_body(
            json!({"candidates": [{"content": {"parts": [{"text": "No."}]}}]}).to_string(),
        )
        .create_async()
        .await;

    let adapter = GeminiAdapter::new(AdapterSettings::new("gk-test", server.url())).unwrap();
    let request = CallRequest::new("gemini25flash", "Tell me a joke").with_system("");
    let result = adapter.call(&model("gemini25flash"), &request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.response_text, "No.");
    // estimate covers only the bare prompt: 14 chars
    assert_eq!(result.usage.input_tokens, 3);
}

#[tokio::test]
async fn test_adapter_rejects_other_vendors_model() {
    // Never reaches the network.
    let adapter = GeminiAdapter::new(AdapterSettings::new("gk-test", "http://127.0.0.1:9")).unwrap();
    let err = adapter
        .call(&model("gpt4o"), &CallRequest::new("gpt4o", "Hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LLMError::InvalidRequest { .. }));
}
