use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use super::long_term::{LongTermMemory, MemoryRecord};
use super::{Conversational, Event, EventStore};
use crate::error::{AgentError, Result};

/// SQLite-backed event log and durable memory.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

type EventRow = (String, String, String, i64, String);

impl SqliteEventStore {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await
            .map_err(AgentError::from)?;

        Self::with_pool(pool).await
    }

    /// A private database living as long as the store; one connection so every
    /// query sees the same data.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await
            .map_err(AgentError::from)?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT NOT NULL UNIQUE,
                session_id TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                payload TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(AgentError::from)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_session ON events (session_id, seq)")
            .execute(&pool)
            .await
            .map_err(AgentError::from)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memory_records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id TEXT NOT NULL UNIQUE,
                namespace TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(AgentError::from)?;

        Ok(Self { pool })
    }

    fn event_from_row(row: EventRow) -> Result<Event> {
        let (event_id, session_id, actor_id, timestamp, payload) = row;
        let payload: Vec<Conversational> = serde_json::from_str(&payload)?;

        Ok(Event {
            event_id,
            session_id,
            actor_id,
            timestamp: from_millis(timestamp)?,
            payload,
        })
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AgentError::Unknown(format!("stored timestamp out of range: {}", millis)))
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn create_event(&self, session_id: &str, actor_id: &str, text: &str) -> Result<Event> {
        let event = Event::new(session_id, actor_id, text);
        let payload = serde_json::to_string(&event.payload)?;

        sqlx::query(
            r#"
            INSERT INTO events (event_id, session_id, actor_id, timestamp, payload)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.session_id)
        .bind(&event.actor_id)
        .bind(event.timestamp.timestamp_millis())
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(AgentError::from)?;

        tracing::debug!(target: "memory", session_id, event_id = %event.event_id, "Created event");
        Ok(event)
    }

    async fn list_events(&self, session_id: &str, max_results: Option<usize>) -> Result<Vec<Event>> {
        // LIMIT -1 means no limit in SQLite
        let limit = max_results.map_or(-1, |max| i64::try_from(max).unwrap_or(i64::MAX));

        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT event_id, session_id, actor_id, timestamp, payload FROM (
                SELECT seq, event_id, session_id, actor_id, timestamp, payload
                FROM events
                WHERE session_id = ?1
                ORDER BY seq DESC
                LIMIT ?2
            )
            ORDER BY seq ASC
            "#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AgentError::from)?;

        rows.into_iter().map(Self::event_from_row).collect()
    }

    async fn delete_event(&self, session_id: &str, event_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE session_id = ?1 AND event_id = ?2")
            .bind(session_id)
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(AgentError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_session(&self, session_id: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM events WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(AgentError::from)?;

        let deleted = result.rows_affected() as usize;
        tracing::info!(target: "memory", session_id, deleted, "Session events cleared");
        Ok(deleted)
    }
}

#[async_trait]
impl LongTermMemory for SqliteEventStore {
    async fn store_memory(&self, namespace: &str, text: &str) -> Result<MemoryRecord> {
        let record = MemoryRecord::new(namespace, text);

        sqlx::query(
            r#"
            INSERT INTO memory_records (record_id, namespace, text, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&record.record_id)
        .bind(&record.namespace)
        .bind(&record.text)
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(AgentError::from)?;

        tracing::info!(target: "memory", namespace, "Stored durable memory");
        Ok(record)
    }

    async fn retrieve_memories(&self, namespace: &str, query: &str) -> Result<Vec<MemoryRecord>> {
        let rows = sqlx::query_as::<_, (String, String, String, i64)>(
            r#"
            SELECT record_id, namespace, text, created_at
            FROM memory_records
            WHERE namespace = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await
        .map_err(AgentError::from)?;

        let mut records = Vec::with_capacity(rows.len());
        for (record_id, namespace, text, created_at) in rows {
            let record = MemoryRecord {
                record_id,
                namespace,
                text,
                created_at: from_millis(created_at)?,
            };
            if record.matches(query) {
                records.push(record);
            }
        }

        Ok(records)
    }
}
