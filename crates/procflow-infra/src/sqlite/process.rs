//! SQLite process repository implementation.
//!
//! Implements `ProcessRepository` from `procflow-core`. The execution tree,
//! input and metadata are stored as JSON text; `root_state` is kept in its
//! own column so listings do not need to decode the tree.

use chrono::{DateTime, SecondsFormat, Utc};
use procflow_core::repository::ProcessRepository;
use procflow_types::error::RepositoryError;
use procflow_types::process::Process;
use procflow_types::tree::ProcessTree;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ProcessRepository`.
pub struct SqliteProcessRepository {
    pool: DatabasePool,
}

impl SqliteProcessRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to a domain `Process`.
struct ProcessRow {
    id: String,
    metadata: String,
    input: String,
    state: String,
    created_at: String,
    updated_at: String,
}

impl ProcessRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            metadata: row.try_get("metadata")?,
            input: row.try_get("input")?,
            state: row.try_get("state")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_process(self) -> Result<Process, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid process id: {e}")))?;

        let metadata: Map<String, Value> = serde_json::from_str(&self.metadata)
            .map_err(|e| RepositoryError::Query(format!("invalid metadata JSON: {e}")))?;

        let input: Map<String, Value> = serde_json::from_str(&self.input)
            .map_err(|e| RepositoryError::Query(format!("invalid input JSON: {e}")))?;

        let tree: ProcessTree = serde_json::from_str(&self.state)
            .map_err(|e| RepositoryError::Query(format!("invalid process state JSON: {e}")))?;

        Ok(Process {
            id,
            metadata,
            input,
            tree,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Column values shared by insert and upsert.
struct Encoded {
    metadata: String,
    input: String,
    state: String,
    root_state: Option<String>,
}

fn encode(process: &Process) -> Result<Encoded, RepositoryError> {
    Ok(Encoded {
        metadata: to_json(&process.metadata)?,
        input: to_json(&process.input)?,
        state: to_json(&process.tree)?,
        root_state: process.root_state().map(|s| s.to_string()),
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(e.to_string()))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn rows_to_processes(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Process>, RepositoryError> {
    rows.iter()
        .map(|row| {
            ProcessRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_process()
        })
        .collect()
}

impl ProcessRepository for SqliteProcessRepository {
    async fn create(&self, process: &Process) -> Result<Process, RepositoryError> {
        let encoded = encode(process)?;

        let result = sqlx::query(
            "INSERT INTO processes (id, root_id, root_state, metadata, input, state, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(process.id.to_string())
        .bind(process.tree.root_id())
        .bind(&encoded.root_state)
        .bind(&encoded.metadata)
        .bind(&encoded.input)
        .bind(&encoded.state)
        .bind(format_datetime(&process.created_at))
        .bind(format_datetime(&process.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(process.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("process '{}' already exists", process.id)),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn save(&self, process: &Process) -> Result<(), RepositoryError> {
        let encoded = encode(process)?;

        sqlx::query(
            "INSERT INTO processes (id, root_id, root_state, metadata, input, state, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                root_state = excluded.root_state,
                metadata = excluded.metadata,
                input = excluded.input,
                state = excluded.state,
                updated_at = excluded.updated_at",
        )
        .bind(process.id.to_string())
        .bind(process.tree.root_id())
        .bind(&encoded.root_state)
        .bind(&encoded.metadata)
        .bind(&encoded.input)
        .bind(&encoded.state)
        .bind(format_datetime(&process.created_at))
        .bind(format_datetime(&process.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::debug!(
            process_id = %process.id,
            root_state = ?process.root_state(),
            "saved process"
        );
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Process>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM processes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let process_row =
                    ProcessRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(process_row.into_process()?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<Process>, RepositoryError> {
        // A negative LIMIT means no limit in SQLite.
        let rows = sqlx::query("SELECT * FROM processes ORDER BY updated_at DESC, id DESC LIMIT ?")
            .bind(limit.unwrap_or(-1))
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_processes(rows)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM processes WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_metadata(
        &self,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Process>, RepositoryError> {
        let path = metadata_path(key);
        let value = to_json(value)?;

        // json_extract alone treats true as 1, so the JSON types must agree too.
        let rows = sqlx::query(
            "SELECT * FROM processes
             WHERE json_type(metadata, ?1) = json_type(?2, '$')
               AND json_extract(metadata, ?1) IS json_extract(?2, '$')
             ORDER BY updated_at DESC, id DESC",
        )
        .bind(path)
        .bind(value)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_processes(rows)
    }
}

/// SQLite JSON path for a dotted metadata key, matching
/// [`Process::metadata_value`]. The first segment is always a top-level key;
/// later numeric segments index arrays.
fn metadata_path(key: &str) -> String {
    let mut path = String::from("$");
    for (i, segment) in key.split('.').enumerate() {
        match segment.parse::<usize>() {
            Ok(index) if i > 0 => path.push_str(&format!("[{index}]")),
            _ => path.push_str(&format!(".\"{}\"", segment.replace('"', "\\\""))),
        }
    }
    path
}
