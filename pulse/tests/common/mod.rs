#![allow(dead_code)]

use std::sync::{Arc, Once};

use pulse::config::{Config, DatabaseConfig, FetchConfig, RefreshConfig, StateConfig};
use pulse::db::{InMemoryStore, StateStore};
use pulse::intelligence::{LlmClassifier, PrimaryClassifier};
use pulse::llm::LlmProvider;
use pulse::models::{Mention, PipelineSettings, SourceKind};
use pulse::processing::MonitorPipeline;
use pulse::state::StateHandle;

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary. `RUST_LOG` controls output.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            url: ":memory:".to_string(),
            auth_token: None,
            local_path: None,
        },
        llm: None,
        fetch: FetchConfig {
            batch_pause_ms: 0,
            relays: vec!["direct".to_string()],
            ..FetchConfig::default()
        },
        state: StateConfig {
            settings_debounce_ms: 10,
            ..StateConfig::default()
        },
        refresh: RefreshConfig { interval_secs: 60 },
        initial_settings: PipelineSettings::default(),
        settings_overrides: Default::default(),
    }
}

pub fn settings(kind: SourceKind, keywords: &[&str]) -> PipelineSettings {
    let mut settings = PipelineSettings::default();
    settings.source.source_type = kind;
    settings.source.keywords = keywords.iter().map(|k| k.to_string()).collect();
    settings.classifier.auto_analyze = false;
    settings
}

pub fn unavailable_primary() -> Arc<dyn PrimaryClassifier> {
    Arc::new(LlmClassifier::new(LlmProvider::unavailable("not configured")))
}

pub fn state_with(store: Arc<dyn StateStore>, settings: PipelineSettings) -> StateHandle {
    StateHandle::new(store, test_config().state, settings)
}

pub fn pipeline(settings: PipelineSettings) -> MonitorPipeline {
    let state = state_with(Arc::new(InMemoryStore::new()), settings);
    MonitorPipeline::new(state, unavailable_primary(), &test_config())
}

pub fn mention(id: &str, content: &str, reach: u64) -> Mention {
    Mention::new(id, content, "Test Source", "Technology").with_reach(reach)
}

/// Minimal RSS 2.0 document with one `<item>` per `(title, description)`.
pub fn rss(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .enumerate()
        .map(|(i, (title, description))| {
            format!(
                "<item><title>{title}</title><description><![CDATA[{description}]]></description>\
                 <link>https://example.com/post/{i}</link><guid>post-{i}</guid>\
                 <pubDate>Wed, 11 Jun 2025 14:00:00 GMT</pubDate></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Test</title>{body}</channel></rss>"
    )
}
