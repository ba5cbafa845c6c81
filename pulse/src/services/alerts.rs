use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::metrics::{window_stats, TREND_HOURS};
use crate::models::{
    Alert, AlertData, AlertRules, AlertType, FetchStatus, Mention, MetricsSnapshot, Severity,
    UrgencyLevel,
};

/// Identity of an alert condition: `<type>:<dedupe key>`.
pub fn fingerprint(alert_type: AlertType, key: &str) -> String {
    format!("{alert_type}:{key}")
}

pub fn alert_fingerprint(alert: &Alert) -> Option<String> {
    alert.dedupe_key().map(|key| fingerprint(alert.alert_type, key))
}

/// Mention id held by a critical-content fingerprint.
pub fn critical_mention_id(fingerprint: &str) -> Option<&str> {
    let (kind, key) = fingerprint.split_once(':')?;
    (kind == AlertType::CriticalContent.to_string()).then_some(key)
}

fn hour_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H").to_string()
}

fn keyed(alert: Alert, key: String, mention: Option<&Mention>) -> Alert {
    let data = AlertData {
        mention_id: mention.map(|m| m.id.clone()),
        recommendation: mention
            .and_then(|m| m.analysis.as_ref())
            .and_then(|a| a.recommended_action.clone()),
        source: mention.map(|m| m.source.clone()),
        dedupe_key: Some(key),
    };
    alert.with_data(data)
}

/// Stateless rule evaluation over the working set and its metrics.
///
/// Returns every alert whose condition currently holds; suppression of
/// already-known conditions is done by [`retain_unseen`].
pub fn evaluate(
    mentions: &[Mention],
    metrics: &MetricsSnapshot,
    rules: &AlertRules,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if rules.critical_content {
        for mention in mentions {
            let Some(analysis) = mention.analysis.as_ref() else {
                continue;
            };
            if analysis.urgency_level != UrgencyLevel::Critical {
                continue;
            }
            let message = if analysis.summary.is_empty() {
                mention.content.clone()
            } else {
                analysis.summary.clone()
            };
            let alert = Alert::new(
                AlertType::CriticalContent,
                Severity::Critical,
                format!("Critical mention on {}", mention.source),
                message,
            )
            .at(now);
            alerts.push(keyed(alert, mention.id.clone(), Some(mention)));
        }
    }

    if let (Some(rule), Some(latest)) = (&rules.volume_spike, metrics.hourly.last()) {
        let previous = &metrics.hourly[..metrics.hourly.len() - 1];
        let baseline = if previous.is_empty() {
            0.0
        } else {
            previous.iter().map(|b| f64::from(b.total)).sum::<f64>() / previous.len() as f64
        };
        if latest.total >= rule.min_mentions && f64::from(latest.total) > rule.multiplier * baseline {
            let alert = Alert::new(
                AlertType::VolumeSpike,
                Severity::High,
                "Mention volume spike",
                format!(
                    "{} mentions in the {} hour against an hourly average of {:.1}",
                    latest.total, latest.hour, baseline
                ),
            )
            .at(now);
            alerts.push(keyed(alert, latest.start.format("%Y-%m-%dT%H").to_string(), None));
        }
    }

    let stats = window_stats(mentions, now, TREND_HOURS);

    if let Some(rule) = &rules.sentiment_threshold {
        if stats.analyzed >= rule.min_sample.max(1) && stats.average_score <= rule.min_average_score {
            let alert = Alert::new(
                AlertType::SentimentThreshold,
                Severity::High,
                "Average sentiment below threshold",
                format!(
                    "24h average score is {:.1} across {} mentions (threshold {:.1})",
                    stats.average_score, stats.analyzed, rule.min_average_score
                ),
            )
            .at(now);
            alerts.push(keyed(alert, format!("average:{}", hour_key(now)), None));
        }
    }

    if let Some(rule) = &rules.negative_share {
        if stats.analyzed >= rule.min_sample.max(1) && stats.negative_share >= rule.max_negative_percent {
            let alert = Alert::new(
                AlertType::SentimentThreshold,
                Severity::Medium,
                "Negative share above threshold",
                format!(
                    "{:.0}% of {} mentions in the last 24h are negative (threshold {:.0}%)",
                    stats.negative_share, stats.analyzed, rule.max_negative_percent
                ),
            )
            .at(now);
            alerts.push(keyed(alert, format!("negative_share:{}", hour_key(now)), None));
        }
    }

    alerts
}

/// Alerts describing a completed fetch cycle: failed feeds and empty results.
pub fn fetch_cycle_alerts(
    statuses: &[FetchStatus],
    accepted: usize,
    rules: &AlertRules,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let mut failed: Vec<&str> = statuses
        .iter()
        .filter(|s| !s.success)
        .map(|s| s.name.as_str())
        .collect();

    if rules.fetch_failures && !failed.is_empty() {
        failed.sort_unstable();
        let severity = if failed.len() == statuses.len() {
            Severity::High
        } else {
            Severity::Medium
        };
        let alert = Alert::new(
            AlertType::FetchStatus,
            severity,
            format!("{} of {} sources failed", failed.len(), statuses.len()),
            format!("Could not fetch: {}", failed.join(", ")),
        )
        .at(now);
        let key = format!("{}:{}", hour_key(now), failed.join("|"));
        alerts.push(keyed(alert, key, None));
    }

    if accepted == 0 && statuses.iter().any(|s| s.success) {
        let alert = Alert::new(
            AlertType::Info,
            Severity::Low,
            "No new mentions",
            "The fetch succeeded but nothing new matched the configured keywords and filters.",
        )
        .at(now);
        alerts.push(keyed(alert, format!("empty:{}", hour_key(now)), None));
    }

    alerts
}

/// Drop candidates whose condition is already known, including repeats
/// within `candidates` itself.
pub fn retain_unseen(candidates: Vec<Alert>, known: &HashSet<String>) -> Vec<Alert> {
    let mut emitted = HashSet::new();
    candidates
        .into_iter()
        .filter(|alert| match alert_fingerprint(alert) {
            Some(fp) => !known.contains(&fp) && emitted.insert(fp),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, HistoricalBucket, Sentiment, SentimentCounts, VolumeSpikeRule};
    use crate::services::metrics::compute_metrics;
    use chrono::Duration;

    fn analyzed(id: &str, sentiment: Sentiment, score: i32, urgency: UrgencyLevel) -> Mention {
        let mut mention = Mention::new(id, "Acme breach detected", "Reddit", "Forum")
            .published_at(Utc::now() - Duration::minutes(5));
        mention.apply_analysis(
            AnalysisResult {
                sentiment,
                sentiment_score: score,
                confidence: 0.8,
                summary: "Breach report".into(),
                rationale: String::new(),
                key_topics: vec![],
                urgency_level: urgency,
                actionable_insights: vec![],
                recommended_action: Some("Escalate".into()),
                is_fallback: true,
                error: None,
            },
            Utc::now(),
        );
        mention
    }

    fn only_critical() -> AlertRules {
        AlertRules {
            critical_content: true,
            volume_spike: None,
            sentiment_threshold: None,
            negative_share: None,
            fetch_failures: false,
        }
    }

    #[test]
    fn test_critical_content_links_mention() {
        let mentions = vec![
            analyzed("m1", Sentiment::Negative, -85, UrgencyLevel::Critical),
            analyzed("m2", Sentiment::Negative, -40, UrgencyLevel::Medium),
        ];
        let now = Utc::now();
        let alerts = evaluate(&mentions, &compute_metrics(&mentions, now), &only_critical(), now);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::CriticalContent);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].mention_id(), Some("m1"));
        assert_eq!(alerts[0].dedupe_key(), Some("m1"));
        assert_eq!(
            alerts[0].data.as_ref().unwrap().recommendation.as_deref(),
            Some("Escalate")
        );
    }

    #[test]
    fn test_known_conditions_are_suppressed() {
        let mentions = vec![analyzed("m1", Sentiment::Negative, -85, UrgencyLevel::Critical)];
        let now = Utc::now();
        let metrics = compute_metrics(&mentions, now);

        let first = retain_unseen(evaluate(&mentions, &metrics, &only_critical(), now), &HashSet::new());
        assert_eq!(first.len(), 1);

        let known: HashSet<String> = first.iter().filter_map(alert_fingerprint).collect();
        let second = retain_unseen(evaluate(&mentions, &metrics, &only_critical(), now), &known);
        assert!(second.is_empty());
    }

    #[test]
    fn test_volume_spike_against_trailing_mean() {
        let now = Utc::now();
        let mut metrics = MetricsSnapshot::default();
        metrics.hourly = (0..24)
            .map(|i| HistoricalBucket {
                hour: format!("{i:02}:00"),
                start: now - Duration::hours(23 - i),
                counts: SentimentCounts::default(),
                total: if i == 23 { 12 } else { 2 },
            })
            .collect();
        let rules = AlertRules {
            volume_spike: Some(VolumeSpikeRule {
                multiplier: 3.0,
                min_mentions: 10,
            }),
            ..only_critical()
        };

        let alerts = evaluate(&[], &metrics, &rules, now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::VolumeSpike);

        metrics.hourly[23].total = 9;
        assert!(evaluate(&[], &metrics, &rules, now).is_empty());
    }

    #[test]
    fn test_sentiment_rules_need_minimum_sample() {
        let mentions: Vec<Mention> = (0..5)
            .map(|i| analyzed(&format!("n{i}"), Sentiment::Negative, -60, UrgencyLevel::High))
            .collect();
        let now = Utc::now();
        let metrics = compute_metrics(&mentions, now);
        let rules = AlertRules {
            critical_content: false,
            volume_spike: None,
            fetch_failures: false,
            ..AlertRules::default()
        };

        let alerts = evaluate(&mentions, &metrics, &rules, now);
        let severities: Vec<Severity> = alerts.iter().map(|a| a.severity).collect();
        assert_eq!(severities, vec![Severity::High, Severity::Medium]);
        assert!(alerts.iter().all(|a| a.alert_type == AlertType::SentimentThreshold));

        assert!(evaluate(&mentions[..4], &compute_metrics(&mentions[..4], now), &rules, now).is_empty());
    }

    #[test]
    fn test_fetch_cycle_alerts() {
        let rules = AlertRules::default();
        let now = Utc::now();
        let statuses = vec![
            FetchStatus::ok("A", 2),
            FetchStatus::failed("B", "timeout"),
            FetchStatus::failed("C", "404"),
        ];
        let alerts = fetch_cycle_alerts(&statuses, 2, &rules, now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::FetchStatus);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert!(alerts[0].message.contains("B, C"));

        let empty = fetch_cycle_alerts(&[FetchStatus::ok("A", 0)], 0, &rules, now);
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].alert_type, AlertType::Info);
    }
}
