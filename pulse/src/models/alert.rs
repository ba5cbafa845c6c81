use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    CriticalContent,
    VolumeSpike,
    SentimentThreshold,
    FetchStatus,
    Info,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CriticalContent => write!(f, "critical_content"),
            Self::VolumeSpike => write!(f, "volume_spike"),
            Self::SentimentThreshold => write!(f, "sentiment_threshold"),
            Self::FetchStatus => write!(f, "fetch_status"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Identity of the triggering condition; an open alert with the same
    /// type and key suppresses re-emission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedupe_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AlertData>,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: nanoid!(),
            alert_type,
            severity,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            acknowledged: false,
            data: None,
        }
    }

    pub fn with_data(mut self, data: AlertData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn dedupe_key(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.dedupe_key.as_deref())
    }

    pub fn mention_id(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.mention_id.as_deref())
    }

    pub fn is_open(&self) -> bool {
        !self.acknowledged
    }
}

/// Persisted alert record: the retained alerts plus fingerprints of
/// conditions the user cleared, so a cleared alert is not raised again.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertLedger {
    pub alerts: Vec<Alert>,
    pub dismissed: Vec<String>,
}
