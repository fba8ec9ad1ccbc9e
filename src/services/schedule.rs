use async_trait::async_trait;
use rusqlite::params;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::clock;
use crate::db::SCHEDULE_SCHEMA;
use crate::error::{AppError, Result};
use crate::models::GeneratedArtifact;

/// Row handed to the downstream scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub title: String,
    pub hashtags: String,
    pub description: String,
    pub body: String,
}

impl From<&GeneratedArtifact> for ScheduleEntry {
    fn from(artifact: &GeneratedArtifact) -> Self {
        Self {
            title: artifact.title.clone(),
            hashtags: artifact.hashtags.clone(),
            description: artifact.description.clone(),
            body: artifact.body.clone(),
        }
    }
}

/// External store that accepts scripts for publication. Insert only.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Insert an entry and return the id the store assigned to it.
    async fn insert_schedule(&self, entry: ScheduleEntry) -> Result<i64>;
}

pub struct SqliteScheduleStore {
    conn: Connection,
}

impl SqliteScheduleStore {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEDULE_SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub async fn titles(&self) -> Result<Vec<(i64, String, String)>> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, title, status FROM schedules ORDER BY id")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    async fn insert_schedule(&self, entry: ScheduleEntry) -> Result<i64> {
        let created_at = clock::format_timestamp(&clock::now());
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO schedules (title, hashtags, description, body, created_at, status)
                       VALUES (?1, ?2, ?3, ?4, ?5, 'pending')"#,
                    params![
                        entry.title,
                        entry.hashtags,
                        entry.description,
                        entry.body,
                        created_at,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| AppError::Schedule(format!("insert failed: {e}")))
    }
}
