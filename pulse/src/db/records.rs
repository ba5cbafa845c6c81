use crate::error::Result;
use chrono::Utc;
use libsql::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const SETTINGS_KEY: &str = "settings";
pub const MENTIONS_KEY: &str = "mentions";
pub const ALERTS_KEY: &str = "alerts";

/// Raw access to the `pulse_state` key-value table.
pub struct StateRecordRepository;

impl StateRecordRepository {
    pub async fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        let mut rows = conn
            .query("SELECT value FROM pulse_state WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get::<String>(0)?))
        } else {
            Ok(None)
        }
    }

    pub async fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO pulse_state (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value, &now],
        )
        .await?;
        Ok(())
    }

    pub async fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let affected = conn
            .execute("DELETE FROM pulse_state WHERE key = ?", [key])
            .await?;
        Ok(affected > 0)
    }

    pub async fn get_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
        match Self::get(conn, key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(conn: &Connection, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        Self::set(conn, key, &raw).await
    }
}
