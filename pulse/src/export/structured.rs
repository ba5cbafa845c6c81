use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ExportSnapshot;
use crate::error::Result;
use crate::models::{
    AlertRules, ClassifierConfig, FilterConfig, HeatmapCell, HistoricalBucket, Mention,
    MetricsSummary, SourceBreakdown, SourceKind, TopicCount, TrendDirection,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    generated_at: DateTime<Utc>,
    last_updated: Option<DateTime<Utc>>,
    generator: &'static str,
    version: &'static str,
    mention_count: usize,
}

/// Settings echo. Credentials are omitted.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Configuration<'a> {
    source_type: SourceKind,
    keywords: &'a [String],
    feeds: Vec<&'a str>,
    filter_config: &'a FilterConfig,
    api_endpoint: Option<&'a str>,
    classifier: &'a ClassifierConfig,
    alert_rules: &'a AlertRules,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredExport<'a> {
    metadata: Metadata,
    configuration: Configuration<'a>,
    summary: &'a MetricsSummary,
    trend: TrendDirection,
    sentiment_by_source: &'a [SourceBreakdown],
    trending_topics: &'a [TopicCount],
    hourly_trend: &'a [HistoricalBucket],
    heatmap: &'a [HeatmapCell],
    mentions: &'a [Mention],
}

/// Hierarchical export as pretty-printed JSON.
pub fn render_structured(snapshot: &ExportSnapshot) -> Result<String> {
    let source = &snapshot.settings.source;
    let metrics = &snapshot.metrics;

    let document = StructuredExport {
        metadata: Metadata {
            generated_at: snapshot.generated_at,
            last_updated: snapshot.last_updated,
            generator: "pulse",
            version: env!("CARGO_PKG_VERSION"),
            mention_count: snapshot.mentions.len(),
        },
        configuration: Configuration {
            source_type: source.source_type,
            keywords: &source.keywords,
            feeds: source.feed_list.iter().map(|f| f.name.as_str()).collect(),
            filter_config: &source.filter_config,
            api_endpoint: source.api_endpoint.as_deref(),
            classifier: &snapshot.settings.classifier,
            alert_rules: &snapshot.settings.alert_rules,
        },
        summary: &metrics.summary,
        trend: metrics.trend,
        sentiment_by_source: &metrics.by_source,
        trending_topics: &metrics.trending_topics,
        hourly_trend: &metrics.hourly,
        heatmap: &metrics.heatmap,
        mentions: &snapshot.mentions,
    };

    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;

    #[test]
    fn test_document_sections() {
        let json = render_structured(&fixtures::snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for key in [
            "metadata",
            "configuration",
            "summary",
            "sentimentBySource",
            "trendingTopics",
            "heatmap",
            "mentions",
        ] {
            assert!(value.get(key).is_some(), "missing section {key}");
        }
        assert_eq!(value["metadata"]["mentionCount"], 2);
        assert_eq!(value["configuration"]["keywords"][0], "Acme");
        assert_eq!(value["heatmap"].as_array().unwrap().len(), 168);
        assert_eq!(value["mentions"][0]["analysis"]["sentimentScore"], 60);
        assert!(value["mentions"][1]["analysis"].is_null());
        assert!(!json.contains("secret-key"));
    }
}
