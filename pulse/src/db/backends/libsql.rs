use crate::db::connection::Database;
use crate::db::records::{StateRecordRepository, ALERTS_KEY, MENTIONS_KEY, SETTINGS_KEY};
use crate::db::traits::StateStore;
use crate::error::Result;
use crate::models::{AlertLedger, Mention, PipelineSettings};
use async_trait::async_trait;

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StateStore for LibSqlBackend {
    async fn load_settings(&self) -> Result<Option<PipelineSettings>> {
        let conn = self.db.connect()?;
        StateRecordRepository::get_json(&conn, SETTINGS_KEY).await
    }

    async fn save_settings(&self, settings: &PipelineSettings) -> Result<()> {
        let conn = self.db.connect()?;
        StateRecordRepository::set_json(&conn, SETTINGS_KEY, settings).await
    }

    async fn load_mentions(&self) -> Result<Vec<Mention>> {
        let conn = self.db.connect()?;
        Ok(StateRecordRepository::get_json(&conn, MENTIONS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save_mentions(&self, mentions: &[Mention]) -> Result<()> {
        let conn = self.db.connect()?;
        StateRecordRepository::set_json(&conn, MENTIONS_KEY, mentions).await
    }

    async fn load_alerts(&self) -> Result<AlertLedger> {
        let conn = self.db.connect()?;
        Ok(StateRecordRepository::get_json(&conn, ALERTS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save_alerts(&self, ledger: &AlertLedger) -> Result<()> {
        let conn = self.db.connect()?;
        StateRecordRepository::set_json(&conn, ALERTS_KEY, ledger).await
    }

    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
