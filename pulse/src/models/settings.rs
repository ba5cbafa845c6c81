use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{PulseError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Synthetic,
    Feeds,
    Manual,
    RemoteApi,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synthetic => write!(f, "synthetic"),
            Self::Feeds => write!(f, "feeds"),
            Self::Manual => write!(f, "manual"),
            Self::RemoteApi => write!(f, "remote_api"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "synthetic" | "demo" => Ok(Self::Synthetic),
            "feeds" | "rss" => Ok(Self::Feeds),
            "manual" => Ok(Self::Manual),
            "remote_api" | "api" => Ok(Self::RemoteApi),
            _ => Err(format!("Unknown source kind: {s}")),
        }
    }
}

/// One syndication feed to poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedEndpoint {
    #[validate(length(min = 1, message = "feed name must not be empty"))]
    pub name: String,
    #[validate(url(message = "feed url must be a valid URL"))]
    pub url: String,
    /// Category tag copied into `Mention::source_type`.
    #[serde(default = "default_feed_category")]
    pub category: String,
    /// Audience estimate assigned to every item from this feed.
    #[serde(default = "default_feed_reach")]
    pub reach: u64,
}

fn default_feed_category() -> String {
    "News".to_string()
}

fn default_feed_reach() -> u64 {
    5_000
}

impl FeedEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category: default_feed_category(),
            reach: default_feed_reach(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub min_reach: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub source_type: SourceKind,
    #[validate(length(min = 1, message = "at least one keyword is required"))]
    pub keywords: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub feed_list: Vec<FeedEndpoint>,
    #[serde(default)]
    pub filter_config: FilterConfig,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Number of mentions produced per synthetic cycle.
    #[serde(default = "default_synthetic_count")]
    pub synthetic_count: usize,
}

fn default_synthetic_count() -> usize {
    12
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            source_type: SourceKind::Synthetic,
            keywords: Vec::new(),
            feed_list: Vec::new(),
            filter_config: FilterConfig::default(),
            api_endpoint: None,
            api_key: None,
            synthetic_count: default_synthetic_count(),
        }
    }
}

impl SourceConfig {
    /// Check every field a fetch cycle depends on. Failures are user-facing
    /// configuration errors and stop the cycle before any work is done.
    pub fn ensure_runnable(&self) -> Result<()> {
        self.validate()?;

        if self.normalized_keywords().is_empty() {
            return Err(PulseError::Configuration(
                "at least one keyword is required".to_string(),
            ));
        }

        match self.source_type {
            SourceKind::Feeds if self.feed_list.is_empty() => Err(PulseError::Configuration(
                "no feed categories selected".to_string(),
            )),
            SourceKind::RemoteApi => {
                let endpoint = self.api_endpoint.as_deref().unwrap_or("").trim();
                let key = self.api_key.as_deref().unwrap_or("").trim();
                if endpoint.is_empty() || key.is_empty() {
                    Err(PulseError::Configuration(
                        "remote API source requires both an endpoint and an API key".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    pub fn normalized_keywords(&self) -> Vec<String> {
        normalize_terms(&self.keywords)
    }
}

/// Trimmed, lowercased, non-empty match terms.
pub fn normalize_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierConfig {
    /// Use the language-model classifier as the primary tier.
    pub enabled: bool,
    /// Free-text description of the brand, passed to the primary classifier.
    pub brand_context: String,
    /// Allow the keyword classifier when the primary tier fails.
    pub fallback_allowed: bool,
    /// Classify new mentions at the end of every fetch cycle.
    pub auto_analyze: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            brand_context: String::new(),
            fallback_allowed: true,
            auto_analyze: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpikeRule {
    /// Latest hour must exceed `multiplier` x the mean of the other 23 hours.
    pub multiplier: f64,
    pub min_mentions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentimentThresholdRule {
    /// Fire when the 24h average score is at or below this value.
    pub min_average_score: f64,
    pub min_sample: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NegativeShareRule {
    /// Fire when the 24h negative share reaches this percentage (0..=100).
    pub max_negative_percent: f64,
    pub min_sample: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertRules {
    pub critical_content: bool,
    pub volume_spike: Option<VolumeSpikeRule>,
    pub sentiment_threshold: Option<SentimentThresholdRule>,
    pub negative_share: Option<NegativeShareRule>,
    /// Raise `fetch_status` alerts when feeds fail.
    pub fetch_failures: bool,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            critical_content: true,
            volume_spike: Some(VolumeSpikeRule {
                multiplier: 3.0,
                min_mentions: 10,
            }),
            sentiment_threshold: Some(SentimentThresholdRule {
                min_average_score: -30.0,
                min_sample: 5,
            }),
            negative_share: Some(NegativeShareRule {
                max_negative_percent: 40.0,
                min_sample: 5,
            }),
            fetch_failures: true,
        }
    }
}

/// Everything the external layer configures for one monitored project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    pub source: SourceConfig,
    pub classifier: ClassifierConfig,
    pub alert_rules: AlertRules,
}
