use std::path::Path;

use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::GraderError;
use crate::models::{Grade, HistoryRecord, Hold};
use crate::store::{HistoryQuery, HistoryStore};

/// Sqlite-backed history store. Appends are single inserts, so a record is
/// either fully visible to concurrent queries or not at all; stored
/// timestamps are clamped non-decreasing in insertion order.
#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, record: &HistoryRecord) -> Result<(), GraderError> {
        let grades = serde_json::to_string(&record.grades)
            .map_err(|e| GraderError::StorageFailure(e.to_string()))?;
        let holds = serde_json::to_string(&record.holds)
            .map_err(|e| GraderError::StorageFailure(e.to_string()))?;

        // The MAX against the stored maximum keeps timestamps non-decreasing
        // in insertion order even when wall clocks step backwards.
        sqlx::query(
            r#"INSERT INTO history (id, ts, object_key, grades, holds)
               VALUES ($1, MAX($2, COALESCE((SELECT MAX(ts) FROM history), 0)), $3, $4, $5)"#,
        )
        .bind(record.id.to_string())
        .bind(record.timestamp_ms)
        .bind(&record.object_key)
        .bind(grades)
        .bind(holds)
        .execute(&self.pool)
        .await
        .map_err(|e| GraderError::StorageFailure(format!("history append failed: {e}")))?;

        debug!(id = %record.id, object_key = %record.object_key, "appended history record");
        Ok(())
    }

    async fn query(&self, query: HistoryQuery) -> Result<Vec<HistoryRecord>, GraderError> {
        let limit: i64 = query.limit.map(i64::from).unwrap_or(-1);
        let rows = sqlx::query(
            r#"SELECT id, ts, object_key, grades, holds FROM history
               WHERE ($1 IS NULL OR ts < $1)
               ORDER BY ts DESC, id DESC
               LIMIT $2"#,
        )
        .bind(query.before_ms)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GraderError::StorageFailure(format!("history query failed: {e}")))?;

        rows.into_iter()
            .map(|row| {
                let id: String = row
                    .try_get("id")
                    .map_err(|e| GraderError::StorageFailure(e.to_string()))?;
                let timestamp_ms: i64 = row
                    .try_get("ts")
                    .map_err(|e| GraderError::StorageFailure(e.to_string()))?;
                let object_key: String = row
                    .try_get("object_key")
                    .map_err(|e| GraderError::StorageFailure(e.to_string()))?;
                let grades: String = row
                    .try_get("grades")
                    .map_err(|e| GraderError::StorageFailure(e.to_string()))?;
                let holds: String = row
                    .try_get("holds")
                    .map_err(|e| GraderError::StorageFailure(e.to_string()))?;

                Ok(HistoryRecord {
                    id: Uuid::parse_str(&id)
                        .map_err(|e| GraderError::StorageFailure(e.to_string()))?,
                    timestamp_ms,
                    object_key,
                    grades: serde_json::from_str::<Vec<Grade>>(&grades)
                        .map_err(|e| GraderError::StorageFailure(e.to_string()))?,
                    holds: serde_json::from_str::<Vec<Hold>>(&holds)
                        .map_err(|e| GraderError::StorageFailure(e.to_string()))?,
                })
            })
            .collect()
    }
}
