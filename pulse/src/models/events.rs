use serde::{Deserialize, Serialize};

use super::{Alert, Mention};

/// Outcome of polling one feed or sub-source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FetchStatus {
    pub name: String,
    pub success: bool,
    pub item_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Relay that produced the successful response, `None` for a direct fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<String>,
}

impl FetchStatus {
    pub fn ok(name: impl Into<String>, item_count: usize) -> Self {
        Self {
            name: name.into(),
            success: true,
            item_count,
            error: None,
            relay: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            item_count: 0,
            error: Some(error.into()),
            relay: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FetchProgress {
    pub current: usize,
    pub total: usize,
    pub per_feed_status: Vec<FetchStatus>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub current: usize,
    pub total: usize,
}

/// Items yielded by a batch-analysis stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    /// One mention was classified and merged back into the working set.
    Progress {
        progress: AnalysisProgress,
        mention_id: String,
        is_fallback: bool,
    },
    /// The mention disappeared from the working set before it was merged.
    Skipped {
        progress: AnalysisProgress,
        mention_id: String,
    },
    /// There was nothing to analyze; the batch is a no-op.
    NothingPending,
}

/// Change notifications published to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    MentionsChanged {
        added: Vec<Mention>,
        updated: Vec<String>,
        total: usize,
    },
    AlertsChanged {
        raised: Vec<Alert>,
        acknowledged: Vec<String>,
        cleared: Vec<String>,
    },
    FetchProgress(FetchProgress),
    AnalysisProgress(AnalysisProgress),
}
