//! Prompt templates for the primary sentiment classifier
//!
//! Templates use `format!()` interpolation so a missing variable is a compile error.

/// System prompt describing the analyst role, optionally scoped to a brand.
pub fn classifier_system_prompt(brand_context: &str) -> String {
    let brand_context = brand_context.trim();
    if brand_context.is_empty() {
        return "You are a brand reputation analyst. You read short public mentions and \
                assess their sentiment and urgency for the communications team."
            .to_string();
    }

    format!(
        "You are a brand reputation analyst. You read short public mentions and assess \
         their sentiment and urgency for the communications team.\n\nBrand context:\n{brand_context}"
    )
}

/// Generate a prompt asking for a structured sentiment analysis of one mention.
///
/// # Example
/// ```
/// use pulse::llm::prompts::sentiment_analysis_prompt;
///
/// let prompt = sentiment_analysis_prompt("Support never answered my ticket", "Reddit");
/// assert!(prompt.contains("never answered"));
/// assert!(prompt.contains("Reddit"));
/// ```
pub fn sentiment_analysis_prompt(content: &str, source_hint: &str) -> String {
    let source_hint = if source_hint.trim().is_empty() {
        "unknown"
    } else {
        source_hint.trim()
    };

    format!(
        r#"Analyze the sentiment of the following mention.

Source: {source_hint}
Mention:
{content}

Respond with a single JSON object and nothing else, using exactly these fields:
{{
  "sentiment": "positive" | "negative" | "neutral" | "mixed",
  "sentimentScore": integer from -100 (very negative) to 100 (very positive),
  "confidence": number from 0.0 to 1.0,
  "summary": one sentence summary,
  "rationale": why you chose this sentiment,
  "keyTopics": up to 5 short topic tags,
  "urgencyLevel": "low" | "medium" | "high" | "critical",
  "actionableInsights": list of short suggestions,
  "recommendedAction": a single recommended next step or null
}}

Use "critical" urgency only for security incidents, legal threats, outages or
anything likely to escalate publicly within hours."#
    )
}
