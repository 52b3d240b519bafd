//! Persistence collaborators for the command broker.
//!
//! Every store takes a `not_before` cutoff on reads and writes: records
//! created before it are expired and must behave as if they were already
//! deleted, whether or not a purge has run yet.

pub mod memory;
pub mod sqlite;

use crate::error::{BrokerError, Result};
use crate::models::{Command, CommandStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub use memory::MemoryCommandStore;
pub use sqlite::SqliteCommandStore;

/// Reject an edge the command state machine does not have.
pub fn check_transition(from: CommandStatus, to: CommandStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(BrokerError::InvalidInput(format!(
            "illegal transition {} -> {}",
            from, to
        )))
    }
}

#[async_trait]
pub trait CommandStore: Send + Sync + 'static {
    /// Persist a freshly created command.
    async fn insert(&self, command: &Command) -> Result<()>;

    /// Look up a live command by id.
    async fn find(&self, id: &str, not_before: DateTime<Utc>) -> Result<Option<Command>>;

    /// Atomically pick the oldest live PENDING command of `owner`, flip it
    /// to PROCESSING and return the updated record. Concurrent callers
    /// never receive the same command.
    async fn claim_oldest_pending(
        &self,
        owner: &str,
        not_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Command>>;

    /// Compare-and-set on status: move `id` from `from` to `to`, storing
    /// `result`. Fails with `InvalidInput` when `from -> to` is not a state
    /// machine edge, `NotFound` for unknown or expired ids and `InvalidState`
    /// when the current status is not `from`.
    async fn transition(
        &self,
        id: &str,
        from: CommandStatus,
        to: CommandStatus,
        result: Option<Value>,
        not_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Command>;

    /// Drop every command created before `cutoff`. Returns how many went.
    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
