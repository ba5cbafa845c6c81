//! Deterministic keyword classifier used when the primary tier is disabled,
//! bypassed or failing.

use crate::models::{AnalysisResult, Sentiment, UrgencyLevel};

pub const POSITIVE_KEYWORDS: &[&str] = &[
    "love",
    "great",
    "excellent",
    "amazing",
    "awesome",
    "fantastic",
    "impressive",
    "impressed",
    "recommend",
    "best",
    "happy",
    "helpful",
    "improved",
    "innovative",
    "outstanding",
    "perfect",
    "intuitive",
    "seamless",
    "delighted",
    "thank",
];

pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "hate",
    "terrible",
    "awful",
    "broken",
    "broke",
    "bug",
    "crash",
    "slow",
    "disappointed",
    "disappointing",
    "frustrat",
    "worst",
    "unresponsive",
    "useless",
    "poor",
    "fail",
    "problem",
    "issue",
    "overpriced",
    "complaint",
    "refund",
    "annoying",
    "glitch",
    "unreliable",
    "waste",
];

pub const CRITICAL_KEYWORDS: &[&str] = &[
    "breach",
    "lawsuit",
    "sued",
    "hacked",
    "data leak",
    "leaked",
    "outage",
    "vulnerability",
    "boycott",
    "recall",
    "fraud",
    "scandal",
    "exploit",
    "ransomware",
    "class action",
];

/// Topic vocabulary: (tag, substrings that imply it).
const TOPIC_VOCABULARY: &[(&str, &[&str])] = &[
    (
        "pricing",
        &["price", "pricing", "cost", "expensive", "cheap", "subscription", "overpriced"],
    ),
    (
        "support",
        &["support", "customer service", "help desk", "ticket", "response time"],
    ),
    (
        "features",
        &["feature", "functionality", "update", "release", "integration"],
    ),
    (
        "technical issues",
        &["bug", "crash", "error", "broke", "outage", "downtime", "glitch", "slow"],
    ),
    (
        "competition",
        &["competitor", "alternative", " vs ", "versus", "switch to", "switched to"],
    ),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordHits {
    pub positive: usize,
    pub negative: usize,
    pub critical: usize,
}

impl KeywordHits {
    pub fn scan(text: &str) -> Self {
        let lower = text.to_lowercase();
        let count = |list: &[&str]| list.iter().filter(|k| lower.contains(*k)).count();
        Self {
            positive: count(POSITIVE_KEYWORDS),
            negative: count(NEGATIVE_KEYWORDS),
            critical: count(CRITICAL_KEYWORDS),
        }
    }
}

pub fn detect_topics(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOPIC_VOCABULARY
        .iter()
        .filter(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(topic, _)| topic.to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> AnalysisResult {
        let hits = KeywordHits::scan(text);
        let (sentiment, score, confidence) = decide(hits);

        let urgency_level = if hits.critical > 0 {
            UrgencyLevel::Critical
        } else if sentiment == Sentiment::Negative && score <= -60 {
            UrgencyLevel::High
        } else if sentiment == Sentiment::Negative {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::Low
        };

        let key_topics = detect_topics(text);
        let (actionable_insights, recommended_action) =
            recommendations(sentiment, urgency_level, &key_topics);

        AnalysisResult {
            sentiment,
            sentiment_score: score,
            confidence,
            summary: summary(sentiment, text),
            rationale: format!(
                "Keyword analysis found {} positive, {} negative and {} critical signals.",
                hits.positive, hits.negative, hits.critical
            ),
            key_topics,
            urgency_level,
            actionable_insights,
            recommended_action,
            is_fallback: true,
            error: None,
        }
        .normalized()
    }
}

fn decide(hits: KeywordHits) -> (Sentiment, i32, f64) {
    let positive = hits.positive as i32;
    let negative = hits.negative as i32;
    let critical = hits.critical as i32;

    if critical > 0 {
        (Sentiment::Negative, (-80 - 5 * critical).max(-100), 0.8)
    } else if positive > negative + 1 {
        (Sentiment::Positive, (20 * positive).min(80), 0.7)
    } else if negative > positive + 1 {
        (Sentiment::Negative, (-20 * negative).max(-80), 0.7)
    } else if positive > 0 && negative > 0 {
        (Sentiment::Mixed, 10 * (positive - negative), 0.6)
    } else {
        (Sentiment::Neutral, 0, 0.5)
    }
}

fn summary(sentiment: Sentiment, text: &str) -> String {
    let excerpt: String = text.split_whitespace().take(16).collect::<Vec<_>>().join(" ");
    format!("{} mention: {}", capitalize(&sentiment.to_string()), excerpt)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn recommendations(
    sentiment: Sentiment,
    urgency: UrgencyLevel,
    topics: &[String],
) -> (Vec<String>, Option<String>) {
    let mut insights = Vec::new();
    for topic in topics {
        let insight = match topic.as_str() {
            "pricing" => "Review pricing feedback with the product team",
            "support" => "Check support response times for this channel",
            "features" => "Share feature feedback with product management",
            "technical issues" => "Forward technical details to engineering",
            "competition" => "Track competitor comparisons in this thread",
            _ => continue,
        };
        insights.push(insight.to_string());
    }

    let action = match (urgency, sentiment) {
        (UrgencyLevel::Critical, _) => Some("Escalate to the incident response team immediately".to_string()),
        (UrgencyLevel::High, _) => Some("Respond publicly within the hour".to_string()),
        (_, Sentiment::Negative) => Some("Reach out to the author and offer help".to_string()),
        (_, Sentiment::Positive) => Some("Thank the author and consider amplifying".to_string()),
        _ => None,
    };

    (insights, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> AnalysisResult {
        KeywordClassifier::new().classify(text)
    }

    #[test]
    fn test_critical_keyword_forces_negative() {
        let result = classify("breach detected");
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert_eq!(result.sentiment_score, -85);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.urgency_level, UrgencyLevel::Critical);
        assert!(result.is_fallback);
    }

    #[test]
    fn test_many_critical_hits_clamp_score() {
        let result = classify(
            "breach lawsuit hacked data leak outage vulnerability boycott fraud scandal",
        );
        assert_eq!(result.sentiment_score, -100);
    }

    #[test]
    fn test_broken_workflow_and_unresponsive_support_is_negative() {
        let result = classify(
            "The new AI update broke our workflow. Support has been unresponsive for 2 days now.",
        );
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.sentiment_score, -40);
        assert_eq!(result.urgency_level, UrgencyLevel::Medium);
        assert!(result.is_fallback);
        assert!(result.key_topics.contains(&"support".to_string()));
        assert!(result.key_topics.contains(&"technical issues".to_string()));
    }

    #[test]
    fn test_positive_needs_margin_of_two() {
        let result = classify("Great product, I love it and recommend it");
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.sentiment_score, 60);
        assert_eq!(result.confidence, 0.7);

        let capped = classify("great love amazing awesome fantastic best happy");
        assert_eq!(capped.sentiment_score, 80);
    }

    #[test]
    fn test_balanced_signals_are_mixed() {
        let result = classify("Great design but slow on older phones");
        assert_eq!(result.sentiment, Sentiment::Mixed);
        assert_eq!(result.sentiment_score, 0);
        assert_eq!(result.confidence, 0.6);
    }

    #[test]
    fn test_no_signals_is_neutral() {
        let result = classify("Acme announced a new office in Lisbon");
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.sentiment_score, 0);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.urgency_level, UrgencyLevel::Low);
    }

    #[test]
    fn test_single_negative_is_not_enough_for_negative() {
        let result = classify("Checkout was slow today");
        assert_eq!(result.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_topic_detection() {
        let topics = detect_topics("Too expensive compared to the competitor, and support ignored me");
        assert_eq!(topics, vec!["pricing", "support", "competition"]);
    }

    #[test]
    fn test_classification_is_total_for_arbitrary_text() {
        for text in ["", " ", "ünïcödé 🚀", "a", &"broken ".repeat(200)] {
            let result = classify(text);
            assert!(Sentiment::CLASSIFIED.contains(&result.sentiment));
            assert!((0.0..=1.0).contains(&result.confidence));
            assert!((-100..=100).contains(&result.sentiment_score));
        }
    }
}
