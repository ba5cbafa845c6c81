//! Derived views over the working set.
//!
//! Everything here is a pure function of `(mentions, now)` and is rebuilt
//! from scratch after every mutation; nothing accumulates between calls.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, DurationRound, Timelike, Utc};

use crate::models::{
    HeatmapCell, HistoricalBucket, Mention, MetricsSnapshot, MetricsSummary, Sentiment,
    SentimentCounts, SourceBreakdown, TopicCount, TrendDirection, UrgencyLevel,
};

pub const TREND_HOURS: i64 = 24;
pub const HEATMAP_DAYS: i64 = 7;
pub const TOP_TOPICS: usize = 10;
pub const TREND_SAMPLE: usize = 10;

pub fn compute_metrics(mentions: &[Mention], now: DateTime<Utc>) -> MetricsSnapshot {
    MetricsSnapshot {
        generated_at: now,
        summary: summarize(mentions),
        hourly: hourly_buckets(mentions, now),
        heatmap: heatmap(mentions, now),
        by_source: source_breakdown(mentions),
        trending_topics: trending_topics(mentions),
        trend: trend_direction(mentions),
    }
}

fn analyzed(mentions: &[Mention]) -> impl Iterator<Item = &Mention> {
    mentions.iter().filter(|m| m.is_analyzed())
}

pub fn summarize(mentions: &[Mention]) -> MetricsSummary {
    let mut counts = SentimentCounts::default();
    let mut score_sum = 0i64;
    let mut confidence_sum = 0.0;
    let mut critical_count = 0;

    for mention in analyzed(mentions) {
        counts.record(mention.sentiment);
        score_sum += i64::from(mention.score().unwrap_or(0));
        confidence_sum += mention.confidence;
        if mention
            .analysis
            .as_ref()
            .is_some_and(|a| a.urgency_level == UrgencyLevel::Critical)
        {
            critical_count += 1;
        }
    }

    let analyzed_count = counts.total() as usize;
    let (average_score, average_confidence, negative_percentage) = if analyzed_count == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let n = analyzed_count as f64;
        (
            score_sum as f64 / n,
            confidence_sum / n,
            f64::from(counts.negative) / n * 100.0,
        )
    };

    MetricsSummary {
        total_mentions: mentions.len(),
        analyzed_count,
        pending_count: mentions.len() - analyzed_count,
        counts,
        average_score,
        average_confidence,
        negative_percentage,
        total_reach: mentions
            .iter()
            .fold(0u64, |acc, m| acc.saturating_add(m.reach)),
        critical_count,
    }
}

fn hour_floor(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::hours(1)).unwrap_or(at)
}

/// 24 hour-wide slots ending with the hour containing `now`, oldest first.
pub fn hourly_buckets(mentions: &[Mention], now: DateTime<Utc>) -> Vec<HistoricalBucket> {
    let current = hour_floor(now);
    let window_start = current - Duration::hours(TREND_HOURS - 1);

    let mut buckets: Vec<HistoricalBucket> = (0..TREND_HOURS)
        .map(|i| {
            let start = window_start + Duration::hours(i);
            HistoricalBucket {
                hour: format!("{:02}:00", start.hour()),
                start,
                counts: SentimentCounts::default(),
                total: 0,
            }
        })
        .collect();

    for mention in analyzed(mentions) {
        if mention.publish_date < window_start || mention.publish_date > now {
            continue;
        }
        let index = (mention.publish_date - window_start).num_hours() as usize;
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.counts.record(mention.sentiment);
            bucket.total += 1;
        }
    }

    buckets
}

/// 7 x 24 grid (Monday first) over the trailing seven days.
pub fn heatmap(mentions: &[Mention], now: DateTime<Utc>) -> Vec<HeatmapCell> {
    let since = now - Duration::days(HEATMAP_DAYS);
    let mut sums = [[(0i64, 0u32); 24]; 7];

    for mention in analyzed(mentions) {
        if mention.publish_date <= since || mention.publish_date > now {
            continue;
        }
        let day = mention.publish_date.weekday().num_days_from_monday() as usize;
        let hour = mention.publish_date.hour() as usize;
        let cell = &mut sums[day][hour];
        cell.0 += i64::from(mention.score().unwrap_or(0));
        cell.1 += 1;
    }

    let mut cells = Vec::with_capacity(7 * 24);
    for (day, hours) in sums.iter().enumerate() {
        for (hour, (sum, count)) in hours.iter().enumerate() {
            cells.push(HeatmapCell {
                day: day as u8,
                hour: hour as u8,
                average_score: if *count == 0 {
                    0.0
                } else {
                    *sum as f64 / f64::from(*count)
                },
                count: *count,
            });
        }
    }
    cells
}

/// Per-source sentiment counts in first-seen order. Sources without any
/// analyzed mention are left out.
pub fn source_breakdown(mentions: &[Mention]) -> Vec<SourceBreakdown> {
    let mut order: Vec<SourceBreakdown> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for mention in analyzed(mentions) {
        let slot = *index.entry(mention.source.as_str()).or_insert_with(|| {
            order.push(SourceBreakdown {
                source: mention.source.clone(),
                counts: SentimentCounts::default(),
                total: 0,
            });
            order.len() - 1
        });
        order[slot].counts.record(mention.sentiment);
        order[slot].total += 1;
    }

    order
}

/// Top topics by count; ties keep first-seen order.
pub fn trending_topics(mentions: &[Mention]) -> Vec<TopicCount> {
    let mut order: Vec<TopicCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for analysis in analyzed(mentions).filter_map(|m| m.analysis.as_ref()) {
        for topic in &analysis.key_topics {
            let key = topic.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            match index.get(&key) {
                Some(&slot) => order[slot].count += 1,
                None => {
                    index.insert(key.clone(), order.len());
                    order.push(TopicCount {
                        topic: key,
                        count: 1,
                    });
                }
            }
        }
    }

    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(TOP_TOPICS);
    order
}

/// Mean score of the ten most recent analyzed mentions against the overall mean.
pub fn trend_direction(mentions: &[Mention]) -> TrendDirection {
    let mut scored: Vec<(DateTime<Utc>, i32)> = analyzed(mentions)
        .filter_map(|m| m.score().map(|s| (m.publish_date, s)))
        .collect();
    if scored.is_empty() {
        return TrendDirection::Stable;
    }

    let mean = |items: &[(DateTime<Utc>, i32)]| {
        items.iter().map(|(_, s)| f64::from(*s)).sum::<f64>() / items.len() as f64
    };
    let overall = mean(&scored);
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    let recent = mean(&scored[..scored.len().min(TREND_SAMPLE)]);

    if recent > overall {
        TrendDirection::Improving
    } else if recent < overall {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

/// Aggregate over analyzed mentions published in the trailing `hours`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub analyzed: usize,
    pub average_score: f64,
    pub negative_share: f64,
}

pub fn window_stats(mentions: &[Mention], now: DateTime<Utc>, hours: i64) -> WindowStats {
    let since = now - Duration::hours(hours);
    let mut analyzed_count = 0usize;
    let mut negative = 0usize;
    let mut score_sum = 0i64;

    for mention in analyzed(mentions) {
        if mention.publish_date < since || mention.publish_date > now {
            continue;
        }
        analyzed_count += 1;
        score_sum += i64::from(mention.score().unwrap_or(0));
        if mention.sentiment == Sentiment::Negative {
            negative += 1;
        }
    }

    if analyzed_count == 0 {
        return WindowStats::default();
    }
    WindowStats {
        analyzed: analyzed_count,
        average_score: score_sum as f64 / analyzed_count as f64,
        negative_share: negative as f64 / analyzed_count as f64 * 100.0,
    }
}
