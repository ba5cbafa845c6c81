use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use super::text::{clean_text, slug, source_qualified_id};
use super::{FetchOutcome, SourceConnector};
use crate::error::{PulseError, Result};
use crate::models::{FetchStatus, Mention, SourceConfig};

const REMOTE_SOURCE: &str = "Remote API";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteMention {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "text")]
    content: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    source_type: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "publishDate")]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reach: Option<u64>,
}

/// Generic HTTP integration: `GET <endpoint>?q=<keywords>` with a bearer key,
/// answered by a JSON array of mentions.
pub struct RemoteApiConnector {
    http_client: reqwest::Client,
}

impl RemoteApiConnector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn request(&self, endpoint: &str, key: &str, keywords: &[String]) -> Result<Vec<RemoteMention>> {
        let response = self
            .http_client
            .get(endpoint)
            .bearer_auth(key)
            .query(&[("q", keywords.join(","))])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

impl RemoteMention {
    fn into_mention(self, scope: &str) -> Option<Mention> {
        let content = clean_text(&self.content);
        if content.is_empty() {
            return None;
        }
        let identity = self.id.unwrap_or_else(|| content.clone());
        let source = self.source.unwrap_or_else(|| REMOTE_SOURCE.to_string());

        Some(
            Mention::new(
                source_qualified_id("api", scope, &identity),
                content,
                source,
                self.source_type.unwrap_or_else(|| "API".to_string()),
            )
            .with_author(self.author.unwrap_or_default())
            .with_url(self.url.unwrap_or_default())
            .with_reach(self.reach.unwrap_or(0))
            .published_at(self.published_at.unwrap_or_else(Utc::now)),
        )
    }
}

#[async_trait]
impl SourceConnector for RemoteApiConnector {
    fn name(&self) -> &str {
        "remote_api"
    }

    async fn fetch(&self, config: &SourceConfig) -> Result<FetchOutcome> {
        let endpoint = config.api_endpoint.as_deref().map(str::trim).unwrap_or("");
        let key = config.api_key.as_deref().map(str::trim).unwrap_or("");
        if endpoint.is_empty() || key.is_empty() {
            return Err(PulseError::Configuration(
                "remote API source requires both an endpoint and an API key".to_string(),
            ));
        }

        let scope = url::Url::parse(endpoint)
            .ok()
            .and_then(|u| u.host_str().map(slug))
            .unwrap_or_default();

        match self.request(endpoint, key, &config.keywords).await {
            Ok(items) => {
                let mentions: Vec<Mention> = items
                    .into_iter()
                    .filter_map(|item| item.into_mention(&scope))
                    .collect();
                let status = FetchStatus::ok(REMOTE_SOURCE, mentions.len());
                Ok(FetchOutcome::new(mentions, vec![status]))
            }
            Err(error) => {
                warn!(endpoint = %endpoint, error = %error, "Remote API fetch failed");
                Ok(FetchOutcome::new(
                    Vec::new(),
                    vec![FetchStatus::failed(REMOTE_SOURCE, error.to_string())],
                ))
            }
        }
    }
}
