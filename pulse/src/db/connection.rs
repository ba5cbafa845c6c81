use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

#[derive(Clone)]
pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    is_remote: bool,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let is_remote = config.url.starts_with("libsql://") || config.url.starts_with("https://");

        let db = if is_remote {
            let token = config.auth_token.clone().unwrap_or_default();
            match config.local_path {
                Some(ref local_path) => {
                    Builder::new_remote_replica(local_path, config.url.clone(), token)
                        .build()
                        .await?
                }
                None => Builder::new_remote(config.url.clone(), token).build().await?,
            }
        } else if config.url == ":memory:" {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self {
            db: Arc::new(db),
            is_remote,
        };
        database.configure().await;
        schema::init_schema(&database.connect()?).await?;

        tracing::debug!(url = %config.url, remote = is_remote, "Database ready");
        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    /// Local files get WAL and a busy timeout. Failures are logged only.
    async fn configure(&self) {
        if self.is_remote {
            return;
        }
        let Ok(conn) = self.connect() else {
            return;
        };
        for pragma in [
            "PRAGMA busy_timeout = 5000",
            "PRAGMA journal_mode = WAL",
            "PRAGMA synchronous = NORMAL",
        ] {
            if let Err(error) = conn.execute_batch(pragma).await {
                tracing::warn!(pragma, error = %error, "Failed to apply SQLite pragma");
            }
        }
    }

    pub async fn sync(&self) -> Result<()> {
        if !self.is_remote {
            return Ok(());
        }
        if let Ok(sync) = self.db.sync().await {
            tracing::info!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}
