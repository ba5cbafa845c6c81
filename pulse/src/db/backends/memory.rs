use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::traits::StateStore;
use crate::error::Result;
use crate::models::{AlertLedger, Mention, PipelineSettings};

/// Volatile store used for `:memory:`-style runs and in tests.
#[derive(Default)]
pub struct InMemoryStore {
    settings: RwLock<Option<PipelineSettings>>,
    mentions: RwLock<Vec<Mention>>,
    alerts: RwLock<AlertLedger>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn load_settings(&self) -> Result<Option<PipelineSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &PipelineSettings) -> Result<()> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }

    async fn load_mentions(&self) -> Result<Vec<Mention>> {
        Ok(self.mentions.read().await.clone())
    }

    async fn save_mentions(&self, mentions: &[Mention]) -> Result<()> {
        *self.mentions.write().await = mentions.to_vec();
        Ok(())
    }

    async fn load_alerts(&self) -> Result<AlertLedger> {
        Ok(self.alerts.read().await.clone())
    }

    async fn save_alerts(&self, ledger: &AlertLedger) -> Result<()> {
        *self.alerts.write().await = ledger.clone();
        Ok(())
    }
}
