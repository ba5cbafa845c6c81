mod feeds;
mod manual;
mod remote_api;
pub mod syndication;
mod synthetic;
pub mod text;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FetchStatus, Mention, SourceConfig};

pub use feeds::FeedAggregator;
pub use manual::ManualImport;
pub use remote_api::RemoteApiConnector;
pub use synthetic::SyntheticGenerator;

/// Result of one connector run. Sub-source failures are recorded in
/// `statuses` and never abort the run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub mentions: Vec<Mention>,
    pub statuses: Vec<FetchStatus>,
}

impl FetchOutcome {
    pub fn new(mentions: Vec<Mention>, statuses: Vec<FetchStatus>) -> Self {
        Self { mentions, statuses }
    }

    pub fn failed_count(&self) -> usize {
        self.statuses.iter().filter(|s| !s.success).count()
    }
}

/// A producer of raw candidate mentions.
///
/// Implementations return `Err` only for configuration problems; network
/// and parse failures degrade to a failed [`FetchStatus`].
#[async_trait]
pub trait SourceConnector: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, config: &SourceConfig) -> Result<FetchOutcome>;
}
