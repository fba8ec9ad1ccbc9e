use std::collections::HashSet;

use chrono::NaiveDateTime;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::clock;
use crate::error::{AppError, Result};
use crate::models::{
    Article, ArticleStatus, ArtifactStatus, GeneratedArtifact, NewArticle, NewArtifact, SourceIds,
    StatusCount,
};

use super::schema::SCHEMA;

const ARTICLE_COLUMNS: &str = "id, url, title, body, published_at, status, processed_at";
const ARTIFACT_COLUMNS: &str =
    "id, title, hashtags, description, body, source_news_ids, status, schedule_id, generated_at";

/// The "content" store: scraped news and the scripts generated from it.
pub struct ContentRepository {
    conn: Connection,
}

impl ContentRepository {
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
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Article operations

    pub async fn article_exists(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT 1 FROM news WHERE url = ?1 LIMIT 1")?;
                Ok(stmt.exists(params![url])?)
            })
            .await?;
        Ok(exists)
    }

    /// Insert a new article or refresh title/body/date of an existing URL.
    /// Status and processed_at of an existing row are never touched.
    pub async fn upsert_article(&self, article: NewArticle) -> Result<i64> {
        let published_at = clock::format_timestamp(&article.published_at);
        let created_at = clock::format_timestamp(&clock::now());
        let id = self
            .conn
            .call(move |conn| {
                let id = conn.query_row(
                    r#"INSERT INTO news (url, title, body, published_at, status, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(url) DO UPDATE SET
                           title = excluded.title,
                           body = excluded.body,
                           published_at = excluded.published_at
                       RETURNING id"#,
                    params![
                        article.url,
                        article.title,
                        article.body,
                        published_at,
                        ArticleStatus::Pending,
                        created_at,
                    ],
                    |row| row.get::<_, i64>(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    #[cfg(test)]
    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ARTICLE_COLUMNS} FROM news WHERE id = ?1"
                ))?;
                let article = stmt.query_row(params![id], article_from_row).optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    #[cfg(test)]
    pub async fn pending_articles(&self) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(|conn| {
                let articles = select_pending(conn)?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// Pending articles that no generated artifact references yet, newest first.
    pub async fn articles_without_artifact(&self) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(|conn| {
                let referenced = referenced_article_ids(conn)?;
                let pending = select_pending(conn)?;
                Ok(pending
                    .into_iter()
                    .filter(|a| !referenced.contains(&a.id))
                    .collect::<Vec<_>>())
            })
            .await?;
        Ok(articles)
    }

    /// Move the given articles from pending to processed in a single update.
    /// Rows that are not pending are left alone; returns the number moved.
    pub async fn mark_articles_processed(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let from = ArticleStatus::Pending;
        let to = from.transition(ArticleStatus::Processed)?;
        let processed_at = clock::format_timestamp(&clock::now());

        let mut values = vec![
            Value::Text(to.as_str().to_string()),
            Value::Text(processed_at),
            Value::Text(from.as_str().to_string()),
        ];
        values.extend(ids.iter().map(|id| Value::Integer(*id)));
        let placeholders = vec!["?"; ids.len()].join(", ");

        let updated = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "UPDATE news SET status = ?1, processed_at = ?2 WHERE status = ?3 AND id IN ({placeholders})"
                );
                Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
            })
            .await?;
        Ok(updated)
    }

    // Artifact operations

    /// Store a generated artifact. Every referenced article must exist.
    pub async fn insert_artifact(&self, artifact: NewArtifact) -> Result<i64> {
        if artifact.source_ids.is_empty() {
            return Err(AppError::Integrity(
                "artifact must reference at least one article".to_string(),
            ));
        }
        let generated_at = clock::format_timestamp(&clock::now());

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let missing = {
                    let mut stmt = tx.prepare("SELECT 1 FROM news WHERE id = ?1")?;
                    let mut missing = Vec::new();
                    for id in artifact.source_ids.as_slice() {
                        if !stmt.exists(params![id])? {
                            missing.push(*id);
                        }
                    }
                    missing
                };
                if !missing.is_empty() {
                    return Ok(Err(missing));
                }
                tx.execute(
                    r#"INSERT INTO generated_artifacts
                           (title, hashtags, description, body, source_news_ids, status, generated_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        artifact.title,
                        artifact.hashtags,
                        artifact.description,
                        artifact.body,
                        artifact.source_ids,
                        ArtifactStatus::Pending,
                        generated_at,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(Ok(id))
            })
            .await?;

        outcome.map_err(|missing| {
            AppError::Integrity(format!("artifact references unknown articles {missing:?}"))
        })
    }

    #[cfg(test)]
    pub async fn get_artifact(&self, id: i64) -> Result<Option<GeneratedArtifact>> {
        let artifact = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ARTIFACT_COLUMNS} FROM generated_artifacts WHERE id = ?1"
                ))?;
                let artifact = stmt.query_row(params![id], artifact_from_row).optional()?;
                Ok(artifact)
            })
            .await?;
        Ok(artifact)
    }

    /// Pending artifacts, oldest generated first.
    pub async fn pending_artifacts(&self) -> Result<Vec<GeneratedArtifact>> {
        let artifacts = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ARTIFACT_COLUMNS} FROM generated_artifacts
                     WHERE status = ?1 ORDER BY generated_at ASC, id ASC"
                ))?;
                let artifacts = stmt
                    .query_map(params![ArtifactStatus::Pending], artifact_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(artifacts)
            })
            .await?;
        Ok(artifacts)
    }

    pub async fn mark_artifact_sent(&self, id: i64, schedule_id: i64) -> Result<()> {
        let from = ArtifactStatus::Pending;
        let to = from.transition(ArtifactStatus::SentToSchedule)?;
        let updated = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "UPDATE generated_artifacts SET status = ?1, schedule_id = ?2 WHERE id = ?3 AND status = ?4",
                    params![to, schedule_id, id, from],
                )?)
            })
            .await?;

        if updated == 0 {
            return Err(AppError::InvalidTransition(format!(
                "artifact {id} is not {from}"
            )));
        }
        Ok(())
    }

    // Statistics

    pub async fn article_stats(&self) -> Result<Vec<StatusCount>> {
        self.status_counts("news").await
    }

    pub async fn artifact_stats(&self) -> Result<Vec<StatusCount>> {
        self.status_counts("generated_artifacts").await
    }

    async fn status_counts(&self, table: &'static str) -> Result<Vec<StatusCount>> {
        let counts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT status, COUNT(*) FROM {table} GROUP BY status ORDER BY status"
                ))?;
                let counts = stmt
                    .query_map([], |row| {
                        Ok(StatusCount {
                            status: row.get(0)?,
                            total: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(counts)
            })
            .await?;
        Ok(counts)
    }

    #[cfg(test)]
    pub async fn force_article_status(&self, id: i64, status: ArticleStatus) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE news SET status = ?1 WHERE id = ?2",
                    params![status, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn select_pending(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<Article>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM news WHERE status = ?1 ORDER BY published_at DESC, id ASC"
    ))?;
    let articles = stmt
        .query_map(params![ArticleStatus::Pending], article_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(articles)
}

/// Union of every article id referenced by any artifact, whatever its status.
fn referenced_article_ids(conn: &rusqlite::Connection) -> rusqlite::Result<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT source_news_ids FROM generated_artifacts")?;
    let lists = stmt
        .query_map([], |row| row.get::<_, SourceIds>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(lists
        .iter()
        .flat_map(|ids| ids.as_slice().iter().copied())
        .collect())
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    clock::parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unparseable timestamp '{raw}'").into(),
        )
    })
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        published_at: timestamp_at(row, 4)?,
        status: row.get(5)?,
        processed_at: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| clock::parse_timestamp(&s)),
    })
}

fn artifact_from_row(row: &Row) -> rusqlite::Result<GeneratedArtifact> {
    Ok(GeneratedArtifact {
        id: row.get(0)?,
        title: row.get(1)?,
        hashtags: row.get(2)?,
        description: row.get(3)?,
        body: row.get(4)?,
        source_ids: row.get(5)?,
        status: row.get(6)?,
        schedule_id: row.get(7)?,
        generated_at: timestamp_at(row, 8)?,
    })
}
