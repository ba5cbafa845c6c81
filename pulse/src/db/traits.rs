use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AlertLedger, Mention, PipelineSettings};

/// Persistence for the three pipeline records. Each record is loaded and
/// saved independently.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_settings(&self) -> Result<Option<PipelineSettings>>;
    async fn save_settings(&self, settings: &PipelineSettings) -> Result<()>;

    async fn load_mentions(&self) -> Result<Vec<Mention>>;
    async fn save_mentions(&self, mentions: &[Mention]) -> Result<()>;

    async fn load_alerts(&self) -> Result<AlertLedger>;
    async fn save_alerts(&self, ledger: &AlertLedger) -> Result<()>;

    /// Push local changes to a remote replica, if any.
    async fn sync(&self) -> Result<()> {
        Ok(())
    }
}
