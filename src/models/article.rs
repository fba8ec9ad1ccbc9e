use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    #[default]
    Pending,
    Processed,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Processed => "processed",
        }
    }

    pub fn can_transition_to(self, next: ArticleStatus) -> bool {
        matches!((self, next), (ArticleStatus::Pending, ArticleStatus::Processed))
    }

    pub fn transition(self, next: ArticleStatus) -> Result<ArticleStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition(format!(
                "article {} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ArticleStatus::Pending),
            "processed" => Ok(ArticleStatus::Processed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl ToSql for ArticleStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ArticleStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A scraped news article, keyed by its source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub body: String,
    pub published_at: NaiveDateTime,
    pub status: ArticleStatus,
    pub processed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub url: String,
    pub title: String,
    pub body: String,
    pub published_at: NaiveDateTime,
}

/// An article that passed the keyword filter, with its classification attached.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredArticle {
    #[serde(flatten)]
    pub article: Article,
    pub category: &'static str,
    pub matched_terms: Vec<&'static str>,
}
