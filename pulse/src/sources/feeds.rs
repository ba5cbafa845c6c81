use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use super::syndication::{parse_feed, FeedEntry};
use super::text::{clean_text, contains_any, slug, source_qualified_id};
use super::{FetchOutcome, SourceConnector};
use crate::config::FetchConfig;
use crate::error::{PulseError, Result};
use crate::models::{
    normalize_terms, FeedEndpoint, FetchProgress, FetchStatus, Mention, SourceConfig,
};

/// Entries at or below this many characters are dropped as teasers.
const MIN_ENTRY_CHARS: usize = 50;

pub const DIRECT_RELAY: &str = "direct";

/// Polls syndication feeds through a relay failover chain.
#[derive(Clone)]
pub struct FeedAggregator {
    http_client: reqwest::Client,
    relays: Vec<String>,
    attempt_timeout: Duration,
    batch_size: usize,
    batch_pause: Duration,
    progress: Option<mpsc::Sender<FetchProgress>>,
}

impl FeedAggregator {
    pub fn new(config: &FetchConfig) -> Self {
        let relays = if config.relays.is_empty() {
            vec![DIRECT_RELAY.to_string()]
        } else {
            config.relays.clone()
        };

        Self {
            http_client: reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .build()
                .unwrap_or_default(),
            relays,
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs.max(1)),
            batch_size: config.batch_size.max(1),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
            progress: None,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Send a [`FetchProgress`] after every batch.
    pub fn with_progress(mut self, sender: mpsc::Sender<FetchProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn relay_url(relay: &str, target: &str) -> String {
        if relay == DIRECT_RELAY {
            return target.to_string();
        }
        let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        relay.replace("{url}", &encoded)
    }

    /// Fetch every feed in batches. Never fails as a whole: each feed
    /// contributes either its matching entries or a failed status.
    pub async fn fetch_feeds(&self, feeds: &[FeedEndpoint], keywords: &[String]) -> FetchOutcome {
        let keywords = normalize_terms(keywords);

        let total = feeds.len();
        let mut statuses = Vec::with_capacity(total);
        let mut mentions = Vec::new();
        let mut seen_content = HashSet::new();

        for (batch_index, batch) in feeds.chunks(self.batch_size).enumerate() {
            if batch_index > 0 && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }

            let results = join_all(batch.iter().map(|feed| self.fetch_feed(feed, &keywords))).await;
            for (feed_mentions, status) in results {
                for mention in feed_mentions {
                    if seen_content.insert(mention.content.clone()) {
                        mentions.push(mention);
                    }
                }
                statuses.push(status);
            }

            if let Some(progress) = &self.progress {
                let update = FetchProgress {
                    current: statuses.len(),
                    total,
                    per_feed_status: statuses.clone(),
                };
                if progress.send(update).await.is_err() {
                    debug!("Fetch progress receiver dropped");
                }
            }
        }

        let failed = statuses.iter().filter(|s| !s.success).count();
        info!(
            feeds = total,
            failed,
            mentions = mentions.len(),
            "Feed fetch complete"
        );

        FetchOutcome::new(mentions, statuses)
    }

    async fn fetch_feed(&self, feed: &FeedEndpoint, keywords: &[String]) -> (Vec<Mention>, FetchStatus) {
        match self.fetch_entries(&feed.url).await {
            Ok((entries, relay)) => {
                let mentions: Vec<Mention> = entries
                    .into_iter()
                    .filter_map(|entry| entry_to_mention(feed, entry, keywords))
                    .collect();
                let mut status = FetchStatus::ok(&feed.name, mentions.len());
                status.relay = relay;
                debug!(feed = %feed.name, items = mentions.len(), "Feed fetched");
                (mentions, status)
            }
            Err(error) => {
                warn!(feed = %feed.name, error = %error, "Feed fetch failed on every relay");
                (Vec::new(), FetchStatus::failed(&feed.name, error.to_string()))
            }
        }
    }

    /// Walk the relay chain until one attempt returns a parseable document.
    async fn fetch_entries(&self, feed_url: &str) -> Result<(Vec<FeedEntry>, Option<String>)> {
        let mut last_error = None;

        for relay in &self.relays {
            let request_url = Self::relay_url(relay, feed_url);
            let attempt = async {
                let body = self
                    .http_client
                    .get(&request_url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                parse_feed(&body)
            };

            let error = match tokio::time::timeout(self.attempt_timeout, attempt).await {
                Ok(Ok(entries)) => {
                    let relay = (relay != DIRECT_RELAY).then(|| relay.clone());
                    return Ok((entries, relay));
                }
                Ok(Err(error)) => error,
                Err(_) => PulseError::SourceFetch(format!(
                    "timed out after {}ms",
                    self.attempt_timeout.as_millis()
                )),
            };
            debug!(relay = %relay, url = %feed_url, error = %error, "Feed attempt failed");
            last_error = Some(error);
        }

        Err(last_error
            .unwrap_or_else(|| PulseError::SourceFetch("no relays configured".to_string())))
    }
}

fn entry_to_mention(feed: &FeedEndpoint, entry: FeedEntry, keywords: &[String]) -> Option<Mention> {
    let title = clean_text(&entry.title);
    let body = clean_text(&entry.description);
    let combined = match (title.is_empty(), body.is_empty()) {
        (false, false) if !body.starts_with(&title) => format!("{title}. {body}"),
        (false, true) => title,
        _ => body,
    };
    let content = clean_text(&combined);

    if content.chars().count() <= MIN_ENTRY_CHARS || !contains_any(&content, keywords) {
        return None;
    }

    let identity = [&entry.guid, &entry.link]
        .into_iter()
        .find(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| content.clone());
    let author = if entry.author.is_empty() {
        feed.name.clone()
    } else {
        entry.author
    };

    Some(
        Mention::new(
            source_qualified_id("feed", &slug(&feed.name), &identity),
            content,
            &feed.name,
            &feed.category,
        )
        .with_author(author)
        .with_url(entry.link)
        .with_reach(feed.reach)
        .published_at(entry.published.unwrap_or_else(Utc::now)),
    )
}

#[async_trait]
impl SourceConnector for FeedAggregator {
    fn name(&self) -> &str {
        "feeds"
    }

    async fn fetch(&self, config: &SourceConfig) -> Result<FetchOutcome> {
        if config.feed_list.is_empty() {
            return Err(PulseError::Configuration(
                "no feed categories selected".to_string(),
            ));
        }
        Ok(self
            .fetch_feeds(&config.feed_list, &config.normalized_keywords())
            .await)
    }
}
