use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of topic tags kept on a single analysis result.
pub const MAX_KEY_TOPICS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    #[default]
    Unanalyzed,
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    /// The four sentiments a classifier may assign.
    pub const CLASSIFIED: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Mixed,
    ];

    pub fn is_classified(&self) -> bool {
        !matches!(self, Self::Unanalyzed)
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unanalyzed => write!(f, "unanalyzed"),
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unanalyzed" => Ok(Self::Unanalyzed),
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "mixed" => Ok(Self::Mixed),
            _ => Err(format!("Unknown sentiment: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for UrgencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown urgency level: {s}")),
        }
    }
}

/// Structured classifier output embedded in a [`Mention`] once analyzed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment: Sentiment,
    /// -100 (very negative) ..= 100 (very positive)
    pub sentiment_score: i32,
    pub confidence: f64,
    pub summary: String,
    pub rationale: String,
    pub key_topics: Vec<String>,
    pub urgency_level: UrgencyLevel,
    pub actionable_insights: Vec<String>,
    pub recommended_action: Option<String>,
    pub is_fallback: bool,
    /// Set when the result is a placeholder produced after a classification failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Clamp numeric fields into range and cap the topic list.
    pub fn normalized(mut self) -> Self {
        self.sentiment_score = self.sentiment_score.clamp(-100, 100);
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut seen = std::collections::HashSet::new();
        self.key_topics
            .retain(|topic| !topic.trim().is_empty() && seen.insert(topic.to_lowercase()));
        self.key_topics.truncate(MAX_KEY_TOPICS);
        self
    }

    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }
}

/// One observed occurrence of tracked content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub id: String,
    pub content: String,
    pub source: String,
    pub source_type: String,
    pub author: String,
    pub url: String,
    pub publish_date: DateTime<Utc>,
    pub reach: u64,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub analysis: Option<AnalysisResult>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl Mention {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        source_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: source.into(),
            source_type: source_type.into(),
            author: String::new(),
            url: String::new(),
            publish_date: Utc::now(),
            reach: 0,
            sentiment: Sentiment::Unanalyzed,
            confidence: 0.0,
            analysis: None,
            analyzed_at: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_reach(mut self, reach: u64) -> Self {
        self.reach = reach;
        self
    }

    pub fn published_at(mut self, publish_date: DateTime<Utc>) -> Self {
        self.publish_date = publish_date;
        self
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn score(&self) -> Option<i32> {
        self.analysis.as_ref().map(|a| a.sentiment_score)
    }

    /// Attach (or fully replace) the analysis. Sentiment and confidence are
    /// always taken from the result so the two never drift apart.
    pub fn apply_analysis(&mut self, result: AnalysisResult, at: DateTime<Utc>) {
        let result = result.normalized();
        self.sentiment = result.sentiment;
        self.confidence = result.confidence;
        self.analysis = Some(result);
        self.analyzed_at = Some(at);
    }

    /// Re-establish `sentiment == Unanalyzed` iff `analysis.is_none()` on
    /// records that did not come through [`Mention::apply_analysis`].
    pub fn normalize(&mut self) {
        match self.analysis.take() {
            Some(result) if result.sentiment.is_classified() => {
                let at = self.analyzed_at.unwrap_or(self.publish_date);
                self.apply_analysis(result, at);
            }
            _ => {
                self.sentiment = Sentiment::Unanalyzed;
                self.confidence = 0.0;
                self.analyzed_at = None;
            }
        }
    }
}
