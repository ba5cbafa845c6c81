use std::sync::Arc;

use tracing::{debug, warn};

use super::fallback::KeywordClassifier;
use super::primary::PrimaryClassifier;
use crate::models::{AnalysisResult, ClassifierConfig, Sentiment, UrgencyLevel};

/// How a single request should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    /// Primary tier first, falling back as configured.
    #[default]
    Auto,
    /// Skip the primary tier entirely.
    FallbackOnly,
}

/// States of one classification request.
///
/// `Start -> PrimaryEnabled -> Done` is the happy path. A primary failure
/// moves to `PrimaryFailed`, which resolves to `Fallback` or
/// `FallbackDisallowed` depending on configuration. Every path ends in `Done`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationState {
    Start,
    PrimaryEnabled,
    PrimaryFailed { reason: String },
    Fallback { after_failure: Option<String> },
    FallbackDisallowed { reason: String },
    Done(Classification),
}

/// Which terminal transition produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationPath {
    Primary,
    /// Primary disabled or explicitly bypassed.
    Fallback,
    FallbackAfterFailure,
    /// Primary failed and fallback was not allowed.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub result: AnalysisResult,
    pub path: ClassificationPath,
}

/// Two-tier sentiment classifier. Never returns an error: every failure
/// resolves to a deterministic result.
#[derive(Clone)]
pub struct SentimentClassifier {
    primary: Arc<dyn PrimaryClassifier>,
    fallback: KeywordClassifier,
    config: ClassifierConfig,
}

impl SentimentClassifier {
    pub fn new(primary: Arc<dyn PrimaryClassifier>, config: ClassifierConfig) -> Self {
        Self {
            primary,
            fallback: KeywordClassifier::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn with_config(&self, config: ClassifierConfig) -> Self {
        Self {
            primary: Arc::clone(&self.primary),
            fallback: self.fallback,
            config,
        }
    }

    pub async fn classify(&self, text: &str, source_hint: &str) -> AnalysisResult {
        self.classify_with(text, source_hint, Route::Auto).await.result
    }

    pub async fn classify_with(&self, text: &str, source_hint: &str, route: Route) -> Classification {
        let mut state = ClassificationState::Start;
        loop {
            state = match state {
                ClassificationState::PrimaryEnabled => {
                    match self
                        .primary
                        .classify(text, source_hint, &self.config.brand_context)
                        .await
                    {
                        Ok(result) => ClassificationState::Done(Classification {
                            result: result.normalized(),
                            path: ClassificationPath::Primary,
                        }),
                        Err(error) => {
                            warn!(
                                classifier = self.primary.name(),
                                error = %error,
                                "Primary classification failed"
                            );
                            ClassificationState::PrimaryFailed {
                                reason: error.to_string(),
                            }
                        }
                    }
                }
                ClassificationState::Done(classification) => {
                    debug!(
                        path = ?classification.path,
                        sentiment = %classification.result.sentiment,
                        "Classification complete"
                    );
                    return classification;
                }
                other => self.advance(other, text, route),
            };
        }
    }

    /// All transitions that need no I/O.
    pub fn advance(&self, state: ClassificationState, text: &str, route: Route) -> ClassificationState {
        match state {
            ClassificationState::Start => {
                if route == Route::FallbackOnly || !self.config.enabled {
                    ClassificationState::Fallback {
                        after_failure: None,
                    }
                } else if !self.primary.is_available() {
                    ClassificationState::PrimaryFailed {
                        reason: format!("primary classifier '{}' unavailable", self.primary.name()),
                    }
                } else {
                    ClassificationState::PrimaryEnabled
                }
            }
            ClassificationState::PrimaryFailed { reason } => {
                if self.config.fallback_allowed {
                    ClassificationState::Fallback {
                        after_failure: Some(reason),
                    }
                } else {
                    ClassificationState::FallbackDisallowed { reason }
                }
            }
            ClassificationState::Fallback { after_failure } => {
                let mut result = self.fallback.classify(text);
                let path = match after_failure {
                    Some(reason) => {
                        result.rationale = format!(
                            "{} Primary classifier failed: {reason}",
                            result.rationale
                        );
                        ClassificationPath::FallbackAfterFailure
                    }
                    None => ClassificationPath::Fallback,
                };
                ClassificationState::Done(Classification { result, path })
            }
            ClassificationState::FallbackDisallowed { reason } => {
                ClassificationState::Done(Classification {
                    result: placeholder(&reason),
                    path: ClassificationPath::Placeholder,
                })
            }
            other => other,
        }
    }
}

/// Neutral, low-confidence result flagged with the failure reason.
pub fn placeholder(reason: &str) -> AnalysisResult {
    AnalysisResult {
        sentiment: Sentiment::Neutral,
        sentiment_score: 0,
        confidence: 0.1,
        summary: "Sentiment could not be determined".to_string(),
        rationale: "Primary classifier failed and fallback classification is disabled."
            .to_string(),
        key_topics: Vec::new(),
        urgency_level: UrgencyLevel::Low,
        actionable_insights: Vec::new(),
        recommended_action: None,
        is_fallback: true,
        error: Some(reason.to_string()),
    }
}
