use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Sentiment;

/// Sentiment counts shared by hourly buckets and per-source breakdowns.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SentimentCounts {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
    pub mixed: u32,
}

impl SentimentCounts {
    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Mixed => self.mixed += 1,
            Sentiment::Unanalyzed => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.positive + self.negative + self.neutral + self.mixed
    }
}

/// One hour of the rolling 24-hour trend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalBucket {
    /// Hour-of-day label, e.g. `"14:00"`.
    pub hour: String,
    pub start: DateTime<Utc>,
    #[serde(flatten)]
    pub counts: SentimentCounts,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    /// 0 = Monday .. 6 = Sunday
    pub day: u8,
    pub hour: u8,
    pub average_score: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub source: String,
    #[serde(flatten)]
    pub counts: SentimentCounts,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicCount {
    pub topic: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Declining => write!(f, "declining"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_mentions: usize,
    pub analyzed_count: usize,
    pub pending_count: usize,
    #[serde(flatten)]
    pub counts: SentimentCounts,
    pub average_score: f64,
    pub average_confidence: f64,
    pub negative_percentage: f64,
    pub total_reach: u64,
    pub critical_count: usize,
}

/// Derived view over the working set, rebuilt from scratch on every mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub summary: MetricsSummary,
    pub hourly: Vec<HistoricalBucket>,
    pub heatmap: Vec<HeatmapCell>,
    pub by_source: Vec<SourceBreakdown>,
    pub trending_topics: Vec<TopicCount>,
    pub trend: TrendDirection,
}
