use serde::Deserialize;
use std::env;

use crate::models::{FeedEndpoint, PipelineSettings, SourceKind};

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

fn parse_list(var: &str, separator: char) -> Vec<String> {
    env::var(var)
        .map(|val| {
            val.split(separator)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Parse `PULSE_FEEDS`.
/// Format: `;`-separated `name|url[|category]` entries, e.g.
/// `Verge|https://www.theverge.com/rss/index.xml|Technology;HN|https://hnrss.org/frontpage`
fn parse_feeds() -> Vec<FeedEndpoint> {
    parse_list("PULSE_FEEDS", ';')
        .into_iter()
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, '|');
            let name = parts.next()?.trim();
            let url = parts.next()?.trim();
            if name.is_empty() || url.is_empty() {
                tracing::warn!("Invalid feed entry '{}' in PULSE_FEEDS, skipping", entry);
                return None;
            }
            let mut feed = FeedEndpoint::new(name, url);
            if let Some(category) = parts.next().map(str::trim).filter(|c| !c.is_empty()) {
                feed = feed.with_category(category);
            }
            Some(feed)
        })
        .collect()
}

/// Settings supplied through `PULSE_*` variables. Each one that is set wins
/// over the persisted value on startup.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SettingsOverrides {
    pub source_type: Option<SourceKind>,
    pub keywords: Option<Vec<String>>,
    pub feed_list: Option<Vec<FeedEndpoint>>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub brand_context: Option<String>,
    pub min_reach: Option<u64>,
}

impl SettingsOverrides {
    pub fn from_env() -> Self {
        let keywords = parse_list("PULSE_KEYWORDS", ',');
        let feeds = parse_feeds();
        Self {
            source_type: parse_env_opt("PULSE_SOURCE"),
            keywords: (!keywords.is_empty()).then_some(keywords),
            feed_list: (!feeds.is_empty()).then_some(feeds),
            api_endpoint: env::var("PULSE_API_ENDPOINT").ok(),
            api_key: env::var("PULSE_API_KEY").ok(),
            brand_context: env::var("PULSE_BRAND_CONTEXT").ok(),
            min_reach: parse_env_opt("PULSE_MIN_REACH"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, settings: &mut PipelineSettings) {
        let source = &mut settings.source;
        if let Some(kind) = self.source_type {
            source.source_type = kind;
        }
        if let Some(keywords) = &self.keywords {
            source.keywords = keywords.clone();
        }
        if let Some(feeds) = &self.feed_list {
            source.feed_list = feeds.clone();
        }
        if let Some(endpoint) = &self.api_endpoint {
            source.api_endpoint = Some(endpoint.clone());
        }
        if let Some(key) = &self.api_key {
            source.api_key = Some(key.clone());
        }
        if let Some(min_reach) = self.min_reach {
            source.filter_config.min_reach = min_reach;
        }
        if let Some(context) = &self.brand_context {
            settings.classifier.brand_context = context.clone();
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: Option<LlmConfig>,
    pub fetch: FetchConfig,
    pub state: StateConfig,
    pub refresh: RefreshConfig,
    /// Used when the store holds no persisted settings yet.
    pub initial_settings: PipelineSettings,
    pub settings_overrides: SettingsOverrides,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

/// LLM configuration for the primary sentiment classifier
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Hard limit on a single feed request through one relay.
    pub attempt_timeout_secs: u64,
    /// Feeds fetched concurrently per batch.
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    /// Relay chain tried in order. `direct` fetches the feed URL itself,
    /// anything else is a URL template containing `{url}`.
    pub relays: Vec<String>,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: 10,
            batch_size: 5,
            batch_pause_ms: 750,
            relays: vec![
                "direct".to_string(),
                "https://api.allorigins.win/raw?url={url}".to_string(),
                "https://corsproxy.io/?{url}".to_string(),
            ],
            user_agent: "Pulse/0.1 (+mention monitor)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    pub max_mentions: usize,
    pub max_alerts: usize,
    pub settings_debounce_ms: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_mentions: 500,
            max_alerts: 100,
            settings_debounce_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let fetch_defaults = FetchConfig::default();
        let state_defaults = StateConfig::default();

        let relays = parse_list("FEED_RELAYS", ',');

        let settings_overrides = SettingsOverrides::from_env();
        let mut initial_settings = PipelineSettings::default();
        settings_overrides.apply(&mut initial_settings);

        Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:pulse.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 2),
            }),
            fetch: FetchConfig {
                attempt_timeout_secs: parse_env_or(
                    "FEED_TIMEOUT_SECS",
                    fetch_defaults.attempt_timeout_secs,
                ),
                batch_size: parse_env_or("FEED_BATCH_SIZE", fetch_defaults.batch_size).max(1),
                batch_pause_ms: parse_env_or("FEED_BATCH_PAUSE_MS", fetch_defaults.batch_pause_ms),
                relays: if relays.is_empty() {
                    fetch_defaults.relays
                } else {
                    relays
                },
                user_agent: env::var("FEED_USER_AGENT").unwrap_or(fetch_defaults.user_agent),
            },
            state: StateConfig {
                max_mentions: parse_env_or("MAX_MENTIONS", state_defaults.max_mentions),
                max_alerts: parse_env_or("MAX_ALERTS", state_defaults.max_alerts),
                settings_debounce_ms: parse_env_or(
                    "SETTINGS_DEBOUNCE_MS",
                    state_defaults.settings_debounce_ms,
                ),
            },
            refresh: RefreshConfig {
                interval_secs: parse_env_or("REFRESH_INTERVAL_SECS", 300),
            },
            initial_settings,
            settings_overrides,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}
