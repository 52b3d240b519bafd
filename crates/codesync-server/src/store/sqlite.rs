//! SQLite-backed command store.
//!
//! Timestamps are stored as Unix milliseconds. The claim is a single
//! `UPDATE ... RETURNING` statement, so SQLite's write lock is the only
//! synchronization needed between concurrent pollers, including pollers
//! in other processes sharing the same database file.

use super::{check_transition, CommandStore};
use crate::error::{BrokerError, Result};
use crate::models::{Command, CommandKind, CommandRequest, CommandStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const COLUMNS: &str = "id, owner, kind, payload, status, result, created_at, updated_at";

pub struct SqliteCommandStore {
    db_path: PathBuf,
    pool: SqlitePool,
}

impl SqliteCommandStore {
    /// Open (or create) the database at `db_path` and ensure the schema.
    pub async fn new(db_path: &Path) -> Result<Self> {
        codesync_common::ensure_parent(db_path)
            .map_err(|e| BrokerError::Storage(e.to_string()))?;

        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            db_path.to_string_lossy().replace('\\', "/")
        ))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self {
            db_path: db_path.to_path_buf(),
            pool,
        };
        store.init_db().await?;

        info!("[Commands] SQLite store at {:?}", store.db_path);
        Ok(store)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS commands (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                owner TEXT NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                status TEXT NOT NULL,
                result TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_commands_owner_status ON commands (owner, status, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn current_status(&self, id: &str, not_before: DateTime<Utc>) -> Result<Option<CommandStatus>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT status FROM commands WHERE id = ? AND created_at >= ?")
                .bind(id)
                .bind(not_before.timestamp_millis())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(status,)| parse_status(&status)).transpose()
    }
}

fn parse_status(s: &str) -> Result<CommandStatus> {
    CommandStatus::from_str(s).map_err(BrokerError::Storage)
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| BrokerError::Storage(format!("timestamp out of range: {}", ms)))
}

fn row_to_command(row: &SqliteRow) -> Result<Command> {
    let kind: String = row.try_get("kind")?;
    let kind = CommandKind::from_str(&kind).map_err(BrokerError::Storage)?;
    let payload: String = row.try_get("payload")?;
    let request = CommandRequest::from_parts(kind, serde_json::from_str(&payload)?)?;

    let status: String = row.try_get("status")?;
    let result = row
        .try_get::<Option<String>, _>("result")?
        .map(|r| serde_json::from_str::<Value>(&r))
        .transpose()?;

    Ok(Command {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        request,
        status: parse_status(&status)?,
        result,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

#[async_trait]
impl CommandStore for SqliteCommandStore {
    async fn insert(&self, command: &Command) -> Result<()> {
        let result = command.result.as_ref().map(Value::to_string);

        sqlx::query(
            "INSERT INTO commands (id, owner, kind, payload, status, result, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&command.id)
        .bind(&command.owner)
        .bind(command.request.kind().as_str())
        .bind(command.request.payload().to_string())
        .bind(command.status.as_str())
        .bind(result)
        .bind(command.created_at.timestamp_millis())
        .bind(command.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: &str, not_before: DateTime<Utc>) -> Result<Option<Command>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM commands WHERE id = ? AND created_at >= ?",
            COLUMNS
        ))
        .bind(id)
        .bind(not_before.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_command).transpose()
    }

    async fn claim_oldest_pending(
        &self,
        owner: &str,
        not_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Command>> {
        let row = sqlx::query(&format!(
            "UPDATE commands SET status = 'PROCESSING', updated_at = ? \
             WHERE seq = (\
                 SELECT seq FROM commands \
                 WHERE owner = ? AND status = 'PENDING' AND created_at >= ? \
                 ORDER BY created_at, seq LIMIT 1\
             ) AND status = 'PENDING' \
             RETURNING {}",
            COLUMNS
        ))
        .bind(now.timestamp_millis())
        .bind(owner)
        .bind(not_before.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_command).transpose()
    }

    async fn transition(
        &self,
        id: &str,
        from: CommandStatus,
        to: CommandStatus,
        result: Option<Value>,
        not_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Command> {
        check_transition(from, to)?;
        let row = sqlx::query(&format!(
            "UPDATE commands SET status = ?, result = ?, updated_at = ? \
             WHERE id = ? AND status = ? AND created_at >= ? \
             RETURNING {}",
            COLUMNS
        ))
        .bind(to.as_str())
        .bind(result.as_ref().map(Value::to_string))
        .bind(now.timestamp_millis())
        .bind(id)
        .bind(from.as_str())
        .bind(not_before.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return row_to_command(&row);
        }

        // Nothing matched: report why.
        match self.current_status(id, not_before).await? {
            None => Err(BrokerError::NotFound(id.to_string())),
            Some(status) => Err(BrokerError::InvalidState {
                id: id.to_string(),
                status,
                target: to,
            }),
        }
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let done = sqlx::query("DELETE FROM commands WHERE created_at < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() as usize)
    }
}
