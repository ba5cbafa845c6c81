//! Export renderers. Both formats are pure transforms of one
//! [`ExportSnapshot`], so their summary sections always agree.

mod structured;
mod tabular;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Result;
use crate::models::{Mention, MetricsSnapshot, PipelineSettings};
use crate::state::PipelineState;

pub use structured::render_structured;
pub use tabular::render_tabular;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Frozen copy of everything an export needs.
#[derive(Debug, Clone)]
pub struct ExportSnapshot {
    pub generated_at: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
    pub settings: PipelineSettings,
    pub mentions: Vec<Mention>,
    pub metrics: MetricsSnapshot,
}

impl ExportSnapshot {
    pub fn capture(state: &PipelineState, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            last_updated: state.last_updated,
            settings: state.settings.clone(),
            mentions: state.mentions.clone(),
            metrics: state.metrics.clone(),
        }
    }

    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => render_tabular(self),
            ExportFormat::Json => render_structured(self),
        }
    }

    /// Suggested file name, e.g. `pulse-export-20250611-1430.csv`.
    pub fn file_name(&self, format: ExportFormat) -> String {
        format!(
            "pulse-export-{}.{}",
            self.generated_at.format("%Y%m%d-%H%M"),
            format.extension()
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, TimeZone, Utc};

    use super::ExportSnapshot;
    use crate::models::{AnalysisResult, Mention, PipelineSettings, Sentiment, UrgencyLevel};
    use crate::services::metrics::compute_metrics;

    pub fn snapshot() -> ExportSnapshot {
        let now = Utc.with_ymd_and_hms(2025, 6, 11, 14, 30, 0).unwrap();
        let mut analyzed = Mention::new("feed:verge:1", "Acme, \"the\" best\nlaunch", "Verge", "Technology")
            .with_author("Jane")
            .with_url("https://example.com/1")
            .with_reach(5000)
            .published_at(now - Duration::minutes(20));
        analyzed.apply_analysis(
            AnalysisResult {
                sentiment: Sentiment::Positive,
                sentiment_score: 60,
                confidence: 0.7,
                summary: "Launch praised".into(),
                rationale: String::new(),
                key_topics: vec!["features".into(), "pricing".into()],
                urgency_level: UrgencyLevel::Low,
                actionable_insights: vec![],
                recommended_action: None,
                is_fallback: true,
                error: None,
            },
            now,
        );
        let pending = Mention::new("manual:abc", "Acme pricing question", "Manual Import", "User Submitted")
            .published_at(now - Duration::hours(2));

        let mut settings = PipelineSettings::default();
        settings.source.keywords = vec!["Acme".into()];
        settings.source.api_key = Some("secret-key".into());

        let mentions = vec![analyzed, pending];
        ExportSnapshot {
            generated_at: now,
            last_updated: Some(now),
            metrics: compute_metrics(&mentions, now),
            settings,
            mentions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_uses_extension() {
        let snapshot = fixtures::snapshot();
        assert_eq!(snapshot.file_name(ExportFormat::Csv), "pulse-export-20250611-1430.csv");
        assert_eq!(snapshot.file_name(ExportFormat::Json), "pulse-export-20250611-1430.json");
    }

    #[test]
    fn test_formats_agree_on_summary() {
        let snapshot = fixtures::snapshot();
        let json: serde_json::Value =
            serde_json::from_str(&snapshot.render(ExportFormat::Json).unwrap()).unwrap();
        let csv = snapshot.render(ExportFormat::Csv).unwrap();

        let header_value = |label: &str| -> String {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(csv.as_bytes());
            reader
                .records()
                .filter_map(|r| r.ok())
                .find(|r| r.get(0) == Some(label))
                .and_then(|r| r.get(1).map(str::to_string))
                .unwrap()
        };

        assert_eq!(
            header_value("Total Mentions"),
            json["summary"]["totalMentions"].to_string()
        );
        assert_eq!(
            header_value("Analyzed"),
            json["summary"]["analyzedCount"].to_string()
        );
    }
}
