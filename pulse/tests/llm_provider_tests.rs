use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use pulse::config::LlmConfig;
use pulse::error::PulseError;
use pulse::intelligence::{LlmClassifier, PrimaryClassifier};
use pulse::llm::{CompletionOptions, LlmBackend, LlmProvider};
use pulse::models::{Sentiment, UrgencyLevel};

fn llm_config(model: &str) -> LlmConfig {
    LlmConfig {
        model: model.to_string(),
        api_key: Some("test-key".to_string()),
        base_url: None,
        timeout_secs: 30,
        max_retries: 3,
    }
}

fn mock_provider(server: &MockServer, max_retries: u32) -> LlmProvider {
    let config = LlmConfig {
        base_url: Some(format!("{}/v1", server.uri())),
        timeout_secs: 5,
        max_retries,
        ..llm_config("openai/gpt-4o-mini")
    };
    LlmProvider::new(Some(&config))
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2 }
    })
}

fn api_error_body(message: &str, error_type: &str, code: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": code
        }
    })
}

const NEGATIVE_VERDICT: &str = r#"{"sentiment":"negative","sentimentScore":-70,"confidence":0.9,
    "summary":"Late delivery","rationale":"Complaint","keyTopics":["shipping"],
    "urgencyLevel":"high","actionableInsights":["Apologize"],"recommendedAction":"Reply"}"#;

#[derive(Debug, Deserialize, PartialEq)]
struct Verdict {
    sentiment: String,
    score: i32,
}

#[test]
fn test_backend_detection() {
    let cases = [
        ("openai/gpt-4o", LlmBackend::OpenAI, "https://api.openai.com/v1", "gpt-4o"),
        (
            "openrouter/openai/gpt-4o-mini",
            LlmBackend::OpenRouter,
            "https://openrouter.ai/api/v1",
            "openai/gpt-4o-mini",
        ),
        ("ollama/llama3.2", LlmBackend::Ollama, "http://localhost:11434/v1", "llama3.2"),
    ];

    for (model, backend, base_url, wire_model) in cases {
        let provider = LlmProvider::new(Some(&llm_config(model)));
        assert_eq!(provider.backend(), &backend);
        assert_eq!(provider.base_url(), Some(base_url));
        assert_eq!(provider.model(), Some(wire_model));
    }
}

#[test]
fn test_custom_endpoint_keeps_full_model_name() {
    let config = LlmConfig {
        base_url: Some("http://localhost:9000/v1".to_string()),
        ..llm_config("acme/sentiment-7b")
    };
    let provider = LlmProvider::new(Some(&config));

    assert!(provider.is_available());
    assert_eq!(provider.base_url(), Some("http://localhost:9000/v1"));
    assert_eq!(provider.model(), Some("acme/sentiment-7b"));
}

#[tokio::test]
async fn test_hosted_model_without_key_is_unavailable() {
    let config = LlmConfig {
        api_key: None,
        ..llm_config("openai/gpt-4o")
    };
    let provider = LlmProvider::new(Some(&config));
    assert!(!provider.is_available());
    assert_eq!(provider.base_url(), None);

    let result: Result<Verdict, PulseError> =
        provider.complete_structured("Acme is late", None, None).await;
    assert!(matches!(result, Err(PulseError::LlmUnavailable(_))));

    let local = LlmConfig {
        api_key: None,
        ..llm_config("ollama/llama3")
    };
    assert!(LlmProvider::new(Some(&local)).is_available());
}

#[tokio::test]
async fn test_missing_configuration_is_unavailable() {
    let provider = LlmProvider::new(None);
    assert!(matches!(provider.backend(), LlmBackend::Unavailable { .. }));

    let result: Result<Verdict, PulseError> =
        provider.complete_structured("Acme is late", None, None).await;
    assert!(matches!(result, Err(PulseError::LlmUnavailable(_))));
}

#[tokio::test]
async fn test_classifier_parses_model_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "max_tokens": 600 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(NEGATIVE_VERDICT)))
        .expect(1)
        .mount(&server)
        .await;

    let classifier = LlmClassifier::new(mock_provider(&server, 0));
    assert!(classifier.is_available());

    let result = classifier
        .classify("Acme lost my parcel again", "X", "Acme ships parcels")
        .await
        .unwrap();

    assert_eq!(result.sentiment, Sentiment::Negative);
    assert_eq!(result.sentiment_score, -70);
    assert_eq!(result.urgency_level, UrgencyLevel::High);
    assert_eq!(result.key_topics, vec!["shipping".to_string()]);
    assert!(!result.is_fallback);
}

#[tokio::test]
async fn test_system_prompt_and_options_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "system", "content": "Classify brand mentions." },
                { "role": "user", "content": "Acme shipped late" }
            ],
            "temperature": 0.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "```json\n{\"sentiment\": \"negative\", \"score\": -40}\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let options = CompletionOptions {
        temperature: Some(0.5),
        max_tokens: None,
    };
    let verdict: Verdict = mock_provider(&server, 0)
        .complete_structured(
            "Acme shipped late",
            Some("Classify brand mentions."),
            Some(&options),
        )
        .await
        .unwrap();

    assert_eq!(
        verdict,
        Verdict {
            sentiment: "negative".to_string(),
            score: -40,
        }
    );
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_mock = Arc::clone(&attempts);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(move |_request: &Request| {
            if attempts_for_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(500).set_body_string("upstream temporary failure")
            } else {
                ResponseTemplate::new(200).set_body_json(completion_body(NEGATIVE_VERDICT))
            }
        })
        .mount(&server)
        .await;

    let classifier = LlmClassifier::new(mock_provider(&server, 2));
    let result = classifier.classify("Acme is slow", "Reddit", "").await.unwrap();

    assert_eq!(result.sentiment, Sentiment::Negative);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_exhausted_quota_is_a_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(api_error_body(
            "Rate limit exceeded",
            "insufficient_quota",
            "insufficient_quota",
        )))
        .mount(&server)
        .await;

    let result = LlmClassifier::new(mock_provider(&server, 1))
        .classify("Acme again", "X", "")
        .await;

    assert!(matches!(
        result,
        Err(PulseError::LlmRateLimit { retry_after: None })
    ));
}

#[tokio::test]
async fn test_rejected_key_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(api_error_body(
            "Invalid API key",
            "invalid_request_error",
            "invalid_api_key",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = LlmClassifier::new(mock_provider(&server, 3))
        .classify("Acme again", "X", "")
        .await;

    match result {
        Err(PulseError::Llm(message)) => {
            assert!(message.to_lowercase().contains("authentication failed"));
        }
        other => panic!("Expected Llm auth error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_prose_reply_is_an_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("I think this mention is negative.")),
        )
        .mount(&server)
        .await;

    let result: Result<Verdict, PulseError> = mock_provider(&server, 0)
        .complete_structured("Acme again", None, None)
        .await;

    assert!(matches!(result, Err(PulseError::Llm(_))));
}

#[tokio::test]
async fn test_blank_prompt_is_rejected() {
    let provider = LlmProvider::new(Some(&llm_config("openai/gpt-4o-mini")));
    let result: Result<Verdict, PulseError> = provider.complete_structured("   ", None, None).await;

    match result {
        Err(PulseError::Validation(message)) => assert!(message.contains("Prompt cannot be empty")),
        other => panic!("Expected Validation error, got: {other:?}"),
    }
}
