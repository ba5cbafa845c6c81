use async_trait::async_trait;
use chrono::Utc;

use super::text::{clean_text, source_qualified_id};
use super::{FetchOutcome, SourceConnector};
use crate::error::Result;
use crate::models::{FetchStatus, Mention, SourceConfig};

/// Lines at or below this many characters are skipped.
const MIN_LINE_CHARS: usize = 20;

pub const MANUAL_SOURCE: &str = "Manual Import";
pub const MANUAL_SOURCE_TYPE: &str = "User Submitted";

/// Bulk text import: one mention per non-trivial pasted line.
pub struct ManualImport {
    text: String,
}

impl ManualImport {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn parse(text: &str) -> Vec<Mention> {
        let now = Utc::now();
        text.lines()
            .map(clean_text)
            .filter(|line| line.chars().count() > MIN_LINE_CHARS)
            .map(|line| {
                Mention::new(
                    source_qualified_id("manual", "", &line),
                    line,
                    MANUAL_SOURCE,
                    MANUAL_SOURCE_TYPE,
                )
                .with_author("user")
                .published_at(now)
            })
            .collect()
    }
}

#[async_trait]
impl SourceConnector for ManualImport {
    fn name(&self) -> &str {
        "manual"
    }

    async fn fetch(&self, _config: &SourceConfig) -> Result<FetchOutcome> {
        let mentions = Self::parse(&self.text);
        let status = FetchStatus::ok(MANUAL_SOURCE, mentions.len());
        Ok(FetchOutcome::new(mentions, vec![status]))
    }
}
