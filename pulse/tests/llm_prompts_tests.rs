use pulse::llm::prompts::{classifier_system_prompt, sentiment_analysis_prompt};

#[test]
fn test_sentiment_prompt_substitution() {
    let content = "Acme support closed my ticket without answering";
    let prompt = sentiment_analysis_prompt(content, "Reddit");

    assert!(prompt.contains(content));
    assert!(prompt.contains("Source: Reddit"));
    assert!(prompt.contains("JSON"));
}

#[test]
fn test_sentiment_prompt_lists_every_field() {
    let prompt = sentiment_analysis_prompt("test", "X");
    for field in [
        "sentiment",
        "sentimentScore",
        "confidence",
        "summary",
        "rationale",
        "keyTopics",
        "urgencyLevel",
        "actionableInsights",
        "recommendedAction",
    ] {
        assert!(prompt.contains(&format!("\"{field}\"")), "missing {field}");
    }
}

#[test]
fn test_blank_source_hint_is_marked_unknown() {
    let prompt = sentiment_analysis_prompt("test", "   ");
    assert!(prompt.contains("Source: unknown"));
}

#[test]
fn test_system_prompt_without_brand_context() {
    let prompt = classifier_system_prompt("  ");
    assert!(prompt.contains("brand reputation analyst"));
    assert!(!prompt.contains("Brand context"));
}

#[test]
fn test_prompts_handle_special_characters() {
    let content = r#"They said "never again" & meant it {really}"#;
    let prompt = sentiment_analysis_prompt(content, "Forum");
    assert!(prompt.contains(content));
}
