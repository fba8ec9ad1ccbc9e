use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    #[default]
    Pending,
    SentToSchedule,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::SentToSchedule => "sent_to_schedule",
        }
    }

    pub fn can_transition_to(self, next: ArtifactStatus) -> bool {
        matches!(
            (self, next),
            (ArtifactStatus::Pending, ArtifactStatus::SentToSchedule)
        )
    }

    pub fn transition(self, next: ArtifactStatus) -> Result<ArtifactStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition(format!(
                "artifact {} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ArtifactStatus::Pending),
            "sent_to_schedule" => Ok(ArtifactStatus::SentToSchedule),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl ToSql for ArtifactStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ArtifactStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Ordered, duplicate-free list of article ids an artifact was generated from.
///
/// Stored as comma-separated text (`"1,3,5"`); that encoding never leaves the
/// `ToSql`/`FromSql` impls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceIds(Vec<i64>);

impl SourceIds {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut out: Vec<i64> = Vec::new();
        for id in ids {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self(out)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Lenient decode: blanks and non-numeric fragments are skipped.
    pub fn decode(s: &str) -> Self {
        Self::new(s.split(',').filter_map(|part| part.trim().parse::<i64>().ok()))
    }
}

impl FromIterator<i64> for SourceIds {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl ToSql for SourceIds {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.encode()))
    }
}

impl FromSql for SourceIds {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(SourceIds::decode(value.as_str()?))
    }
}

/// An AI-written video script waiting for, or already handed to, the schedule store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub id: i64,
    pub title: String,
    pub hashtags: String,
    pub description: String,
    pub body: String,
    pub source_ids: SourceIds,
    pub status: ArtifactStatus,
    pub schedule_id: Option<i64>,
    pub generated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArtifact {
    pub title: String,
    pub hashtags: String,
    pub description: String,
    pub body: String,
    pub source_ids: SourceIds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_encode_in_order() {
        let ids = SourceIds::new([5, 1, 3]);
        assert_eq!(ids.encode(), "5,1,3");
    }

    #[test]
    fn source_ids_drop_duplicates_keeping_first() {
        let ids = SourceIds::new([3, 1, 3, 2, 1]);
        assert_eq!(ids.as_slice(), &[3, 1, 2]);
    }

    #[test]
    fn decode_tolerates_spaces_and_junk() {
        let ids = SourceIds::decode(" 1, 3 ,x,,5 ");
        assert_eq!(ids.as_slice(), &[1, 3, 5]);
        assert!(SourceIds::decode("").is_empty());
    }

    #[test]
    fn sent_is_terminal() {
        assert!(ArtifactStatus::Pending
            .transition(ArtifactStatus::SentToSchedule)
            .is_ok());
        assert!(ArtifactStatus::SentToSchedule
            .transition(ArtifactStatus::Pending)
            .is_err());
        assert_eq!(
            "sent_to_schedule".parse::<ArtifactStatus>().unwrap(),
            ArtifactStatus::SentToSchedule
        );
    }
}
