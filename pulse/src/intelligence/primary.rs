use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{PulseError, Result};
use crate::llm::{prompts, CompletionOptions, LlmProvider};
use crate::models::{AnalysisResult, Sentiment, UrgencyLevel};

/// The remote, first-choice classification tier.
#[async_trait]
pub trait PrimaryClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    async fn classify(
        &self,
        text: &str,
        source_hint: &str,
        brand_context: &str,
    ) -> Result<AnalysisResult>;
}

/// Wire format expected back from the language model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSentimentResponse {
    sentiment: String,
    #[serde(default)]
    sentiment_score: f64,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    key_topics: Vec<String>,
    #[serde(default)]
    urgency_level: Option<String>,
    #[serde(default)]
    actionable_insights: Vec<String>,
    #[serde(default)]
    recommended_action: Option<String>,
}

impl LlmSentimentResponse {
    fn into_result(self) -> Result<AnalysisResult> {
        let sentiment: Sentiment = self
            .sentiment
            .parse()
            .map_err(PulseError::Classification)?;
        if !sentiment.is_classified() {
            return Err(PulseError::Classification(format!(
                "classifier returned non-final sentiment '{}'",
                self.sentiment
            )));
        }

        let urgency_level = self
            .urgency_level
            .as_deref()
            .map(str::parse::<UrgencyLevel>)
            .transpose()
            .map_err(PulseError::Classification)?
            .unwrap_or_default();

        Ok(AnalysisResult {
            sentiment,
            sentiment_score: self.sentiment_score.round() as i32,
            confidence: self.confidence,
            summary: self.summary,
            rationale: self.rationale,
            key_topics: self.key_topics,
            urgency_level,
            actionable_insights: self.actionable_insights,
            recommended_action: self.recommended_action.filter(|a| !a.trim().is_empty()),
            is_fallback: false,
            error: None,
        }
        .normalized())
    }
}

/// Primary classifier backed by an OpenAI-compatible chat model.
#[derive(Clone)]
pub struct LlmClassifier {
    llm: LlmProvider,
    options: CompletionOptions,
}

impl LlmClassifier {
    pub fn new(llm: LlmProvider) -> Self {
        Self {
            llm,
            options: CompletionOptions {
                temperature: Some(0.1),
                max_tokens: Some(600),
            },
        }
    }
}

#[async_trait]
impl PrimaryClassifier for LlmClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    fn is_available(&self) -> bool {
        self.llm.is_available()
    }

    async fn classify(
        &self,
        text: &str,
        source_hint: &str,
        brand_context: &str,
    ) -> Result<AnalysisResult> {
        let prompt = prompts::sentiment_analysis_prompt(text, source_hint);
        let system = prompts::classifier_system_prompt(brand_context);

        let response: LlmSentimentResponse = self
            .llm
            .complete_structured(&prompt, Some(&system), Some(&self.options))
            .await?;

        response.into_result()
    }
}
