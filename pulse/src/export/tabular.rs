use csv::WriterBuilder;

use super::ExportSnapshot;
use crate::error::{PulseError, Result};
use crate::models::Mention;

pub const COLUMNS: [&str; 13] = [
    "timestamp",
    "source",
    "content",
    "sentiment",
    "score",
    "confidence",
    "summary",
    "topics",
    "urgency",
    "reach",
    "author",
    "url",
    "status",
];

fn status(mention: &Mention) -> &'static str {
    match &mention.analysis {
        Some(analysis) if analysis.is_errored() => "error",
        Some(analysis) if analysis.is_fallback => "analyzed (fallback)",
        Some(_) => "analyzed",
        None => "pending",
    }
}

/// Flattened export: a two-column metadata block, a blank line, then one
/// row per mention under [`COLUMNS`].
pub fn render_tabular(snapshot: &ExportSnapshot) -> Result<String> {
    let summary = &snapshot.metrics.summary;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());

    let header: Vec<(&str, String)> = vec![
        ("Pulse Export", snapshot.generated_at.to_rfc3339()),
        (
            "Last Updated",
            snapshot
                .last_updated
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        ),
        ("Keywords", snapshot.settings.source.keywords.join("; ")),
        ("Source", snapshot.settings.source.source_type.to_string()),
        ("Total Mentions", summary.total_mentions.to_string()),
        ("Analyzed", summary.analyzed_count.to_string()),
        ("Positive", summary.counts.positive.to_string()),
        ("Negative", summary.counts.negative.to_string()),
        ("Neutral", summary.counts.neutral.to_string()),
        ("Mixed", summary.counts.mixed.to_string()),
        ("Average Score", format!("{:.1}", summary.average_score)),
        ("Negative %", format!("{:.1}", summary.negative_percentage)),
        ("Total Reach", summary.total_reach.to_string()),
        ("Trend", snapshot.metrics.trend.to_string()),
    ];
    for (label, value) in &header {
        writer.write_record([*label, value.as_str()])?;
    }
    writer.write_record([""])?;
    writer.write_record(COLUMNS)?;

    for mention in &snapshot.mentions {
        let analysis = mention.analysis.as_ref();
        writer.write_record([
            mention.publish_date.to_rfc3339(),
            mention.source.clone(),
            mention.content.clone(),
            mention.sentiment.to_string(),
            analysis
                .map(|a| a.sentiment_score.to_string())
                .unwrap_or_default(),
            analysis
                .map(|a| format!("{:.2}", a.confidence))
                .unwrap_or_default(),
            analysis.map(|a| a.summary.clone()).unwrap_or_default(),
            analysis.map(|a| a.key_topics.join("; ")).unwrap_or_default(),
            analysis
                .map(|a| a.urgency_level.to_string())
                .unwrap_or_default(),
            mention.reach.to_string(),
            mention.author.clone(),
            mention.url.clone(),
            status(mention).to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PulseError::Internal(format!("failed to flush CSV export: {e}")))?;
    String::from_utf8(bytes).map_err(|e| PulseError::Internal(e.to_string()))
}
