use std::env;

use serial_test::serial;

use pulse::config::{parse_llm_provider_model, Config, LlmConfig, KNOWN_LLM_PROVIDERS};
use pulse::llm::{LlmBackend, LlmProvider};
use pulse::models::SourceKind;

const LLM_VARS: [&str; 5] = [
    "LLM_MODEL",
    "LLM_API_KEY",
    "LLM_BASE_URL",
    "LLM_TIMEOUT",
    "LLM_MAX_RETRIES",
];

fn clear_llm_env() {
    for var in LLM_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_llm_config_openai() {
    let (provider, model) = parse_llm_provider_model("openai/gpt-4o");
    assert_eq!(provider, "openai");
    assert_eq!(model, "gpt-4o");
}

#[test]
fn test_llm_config_openrouter_keeps_nested_model() {
    let (provider, model) = parse_llm_provider_model("openrouter/anthropic/claude-3.5-sonnet");
    assert_eq!(provider, "openrouter");
    assert_eq!(model, "anthropic/claude-3.5-sonnet");
}

#[test]
fn test_llm_config_unknown_prefix_defaults_to_local() {
    let (provider, model) = parse_llm_provider_model("unknown/model-name");
    assert_eq!(provider, "local");
    assert_eq!(model, "unknown/model-name");
}

#[test]
fn test_known_llm_providers_constant() {
    for provider in ["openai", "openrouter", "ollama", "lmstudio"] {
        assert!(KNOWN_LLM_PROVIDERS.contains(&provider));
    }
    assert_eq!(KNOWN_LLM_PROVIDERS.len(), 4);
}

#[test]
#[serial]
fn test_llm_config_none_when_no_env() {
    clear_llm_env();
    let config = Config::default();
    assert!(
        config.llm.is_none(),
        "LlmConfig should be None when LLM_MODEL is not set"
    );
}

#[test]
#[serial]
fn test_llm_config_with_all_env_vars() {
    env::set_var("LLM_MODEL", "openrouter/anthropic/claude-3.5-sonnet");
    env::set_var("LLM_API_KEY", "sk-test-key");
    env::set_var("LLM_BASE_URL", "https://api.custom.com/v1");
    env::set_var("LLM_TIMEOUT", "60");
    env::set_var("LLM_MAX_RETRIES", "5");

    let config = Config::default();
    clear_llm_env();

    let llm = config.llm.expect("LlmConfig should exist");
    assert_eq!(llm.model, "openrouter/anthropic/claude-3.5-sonnet");
    assert_eq!(llm.api_key, Some("sk-test-key".to_string()));
    assert_eq!(llm.base_url, Some("https://api.custom.com/v1".to_string()));
    assert_eq!(llm.timeout_secs, 60);
    assert_eq!(llm.max_retries, 5);
}

#[test]
#[serial]
fn test_invalid_numeric_env_falls_back() {
    env::set_var("LLM_MODEL", "ollama/llama3");
    env::set_var("LLM_TIMEOUT", "soon");
    env::set_var("MAX_MENTIONS", "lots");

    let config = Config::default();
    clear_llm_env();
    env::remove_var("MAX_MENTIONS");

    assert_eq!(config.llm.map(|l| l.timeout_secs), Some(30));
    assert_eq!(config.state.max_mentions, 500);
}

#[test]
#[serial]
fn test_pipeline_env_seeds_initial_settings() {
    env::set_var("PULSE_SOURCE", "api");
    env::set_var("PULSE_KEYWORDS", "Acme");
    env::set_var("PULSE_API_ENDPOINT", "https://api.example.com/mentions");
    env::set_var("PULSE_API_KEY", "k");
    env::set_var("PULSE_MIN_REACH", "250");

    let config = Config::default();
    for var in [
        "PULSE_SOURCE",
        "PULSE_KEYWORDS",
        "PULSE_API_ENDPOINT",
        "PULSE_API_KEY",
        "PULSE_MIN_REACH",
    ] {
        env::remove_var(var);
    }

    let source = &config.initial_settings.source;
    assert_eq!(source.source_type, SourceKind::RemoteApi);
    assert_eq!(source.filter_config.min_reach, 250);
    assert!(source.ensure_runnable().is_ok());
}

#[test]
fn test_provider_backend_selection() {
    let config = |model: &str, base_url: Option<&str>| LlmConfig {
        model: model.to_string(),
        api_key: Some("k".to_string()),
        base_url: base_url.map(str::to_string),
        timeout_secs: 5,
        max_retries: 0,
    };

    assert_eq!(
        *LlmProvider::new(Some(&config("ollama/llama3", None))).backend(),
        LlmBackend::Ollama
    );
    assert!(matches!(
        LlmProvider::new(Some(&config("my-model", Some("http://localhost:9000/v1")))).backend(),
        LlmBackend::OpenAICompatible { .. }
    ));
    assert!(!LlmProvider::new(Some(&config("my-model", None))).is_available());
    assert!(!LlmProvider::new(None).is_available());
}
