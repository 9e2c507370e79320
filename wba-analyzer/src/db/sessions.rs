//! Session history database operations
//!
//! One row per analysis call. Written once by the orchestrator, read only by
//! the history endpoint.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use wba_common::{Emotion, Result};

/// Longest text snippet kept with a session, in characters
pub const TEXT_SNIPPET_MAX_CHARS: usize = 500;

/// Session record to persist
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub wellbeing_score: f64,
    /// None when no modality produced a signal
    pub dominant_emotion: Option<Emotion>,
    pub recommendation: String,
    /// Submitted text, if any; truncated on save
    pub text_snippet: Option<String>,
}

/// Persisted session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub wellbeing_score: f64,
    pub dominant_emotion: Option<Emotion>,
    pub recommendation: String,
    pub text_snippet: String,
}

/// Append-only store of session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a record and return its id
    async fn save(&self, session: &NewSession) -> Result<i64>;

    /// Most recent records for a user, newest first
    async fn history(&self, user_id: &str, limit: u32) -> Result<Vec<SessionRecord>>;
}

/// Session store backed by the service's SQLite pool
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn truncate_snippet(text: Option<&str>) -> String {
    text.map(|t| t.chars().take(TEXT_SNIPPET_MAX_CHARS).collect())
        .unwrap_or_default()
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn save(&self, session: &NewSession) -> Result<i64> {
        // Fixed-width UTC form so text ordering matches time ordering
        let timestamp = session.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);
        let dominant_emotion = session.dominant_emotion.map(Emotion::as_str);
        let text_snippet = truncate_snippet(session.text_snippet.as_deref());

        let result = sqlx::query(
            r#"
            INSERT INTO sessions (
                user_id, timestamp, wellbeing_score, dominant_emotion,
                recommendation, text_snippet
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.user_id)
        .bind(&timestamp)
        .bind(session.wellbeing_score)
        .bind(dominant_emotion)
        .bind(&session.recommendation)
        .bind(&text_snippet)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn history(&self, user_id: &str, limit: u32) -> Result<Vec<SessionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, timestamp, wellbeing_score, dominant_emotion,
                   recommendation, text_snippet
            FROM sessions
            WHERE user_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let timestamp: String = row.get("timestamp");
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| {
                        wba_common::Error::Internal(format!("Failed to parse timestamp: {}", e))
                    })?
                    .with_timezone(&Utc);

                let dominant_emotion: Option<String> = row.get("dominant_emotion");
                let dominant_emotion = dominant_emotion
                    .map(|label| label.parse::<Emotion>())
                    .transpose()?;

                Ok(SessionRecord {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    timestamp,
                    wellbeing_score: row.get("wellbeing_score"),
                    dominant_emotion,
                    recommendation: row.get("recommendation"),
                    text_snippet: row.get("text_snippet"),
                })
            })
            .collect()
    }
}
