use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::LlmConfig;
use crate::error::{PulseError, Result};
use crate::llm::provider::CompletionOptions;

const RATE_LIMIT_MARKERS: [&str; 4] = [
    "rate limit",
    "rate_limit",
    "too many requests",
    "insufficient_quota",
];
const AUTH_MARKERS: [&str; 4] = [
    "unauthorized",
    "invalid api key",
    "invalid_api_key",
    "authentication",
];

/// How a failed request should be handled.
enum Failure {
    Retry(PulseError),
    Stop(PulseError),
}

/// One chat-completions endpoint and model.
pub(crate) struct ChatClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_retries: u32,
}

impl ChatClient {
    pub(crate) fn new(base_url: &str, model: &str, config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PulseError::Llm(format!("Failed to create LLM HTTP client: {e}")))?;

        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(config.api_key.clone().unwrap_or_default());

        // async-openai retries 5xx on its own; bound that by the request
        // timeout so a dead endpoint still reaches the keyword fallback.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(timeout),
            ..Default::default()
        };

        Ok(Self {
            client: Client::with_config(openai_config)
                .with_http_client(http)
                .with_backoff(backoff),
            model: model.to_string(),
            max_retries: config.max_retries,
        })
    }

    /// Send one exchange and parse the reply as JSON. Replies wrapped in a
    /// markdown code fence are accepted.
    pub(crate) async fn json_reply(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<Value> {
        let request = self.request(prompt, system_prompt, options)?;
        let content = self.send(request).await?;

        serde_json::from_str(strip_code_fence(&content)).map_err(|e| {
            tracing::warn!(
                response_len = content.len(),
                response_preview = %content.chars().take(100).collect::<String>(),
                error = %e,
                "LLM reply is not JSON"
            );
            PulseError::Llm(format!("Failed to parse JSON response: {e}"))
        })
    }

    async fn send(&self, request: CreateChatCompletionRequest) -> Result<String> {
        let mut attempt = 0;
        loop {
            let error = match self.client.chat().create(request.clone()).await {
                Ok(response) => {
                    let content = response
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.message.content)
                        .unwrap_or_default();
                    if content.trim().is_empty() {
                        return Err(PulseError::Llm("LLM reply was empty".to_string()));
                    }
                    return Ok(content);
                }
                Err(error) => error,
            };

            match classify(error) {
                Failure::Retry(error) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, %error, "Retrying LLM request");
                    tokio::time::sleep(Duration::from_millis(100 << (attempt - 1))).await;
                }
                Failure::Retry(error) | Failure::Stop(error) => return Err(error),
            }
        }
    }

    fn request(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<CreateChatCompletionRequest> {
        let invalid = |e| PulseError::Validation(format!("Invalid LLM request: {e}"));

        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
            let message = ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(invalid)?;
            messages.push(message.into());
        }
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(invalid)?;
        messages.push(message.into());

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone()).messages(messages);
        if let Some(options) = options {
            if let Some(temperature) = options.temperature {
                args.temperature(temperature);
            }
            if let Some(max_tokens) = options.max_tokens {
                args.max_tokens(max_tokens);
            }
        }
        args.build().map_err(invalid)
    }
}

fn rate_limited() -> PulseError {
    PulseError::LlmRateLimit { retry_after: None }
}

fn mentions_any(api_error: &ApiError, markers: &[&str]) -> bool {
    let text = format!(
        "{} {} {}",
        api_error.message,
        api_error.r#type.as_deref().unwrap_or_default(),
        api_error.code.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    markers.iter().any(|marker| text.contains(marker))
}

/// Rate limits and auth failures stop at once so the caller can fall back;
/// transport and untyped server errors are worth another attempt.
fn classify(error: OpenAIError) -> Failure {
    match error {
        OpenAIError::Reqwest(e) => match e.status() {
            Some(StatusCode::TOO_MANY_REQUESTS) => Failure::Stop(rate_limited()),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Failure::Stop(PulseError::Llm(format!("LLM authentication failed: {e}")))
            }
            Some(status) if !status.is_server_error() => {
                Failure::Stop(PulseError::Llm(format!("LLM request failed: {e}")))
            }
            _ => Failure::Retry(PulseError::Llm(format!("LLM request failed: {e}"))),
        },
        OpenAIError::ApiError(api_error) => {
            if mentions_any(&api_error, &RATE_LIMIT_MARKERS) {
                tracing::warn!(message = %api_error.message, "LLM rate limit reached");
                Failure::Stop(rate_limited())
            } else if mentions_any(&api_error, &AUTH_MARKERS) {
                Failure::Stop(PulseError::Llm(format!(
                    "LLM authentication failed: {api_error}"
                )))
            } else if api_error.r#type.is_none() && api_error.code.is_none() {
                Failure::Retry(PulseError::Llm(format!("LLM API error: {api_error}")))
            } else {
                Failure::Stop(PulseError::Llm(format!("LLM API error: {api_error}")))
            }
        }
        OpenAIError::JSONDeserialize(e) => {
            Failure::Stop(PulseError::Llm(format!("Failed to parse LLM response: {e}")))
        }
        OpenAIError::InvalidArgument(message) => Failure::Stop(PulseError::Validation(message)),
        other => Failure::Stop(PulseError::Llm(other.to_string())),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
