//! Process-local command store.
//!
//! Suitable for a single server instance and for tests. A multi-instance
//! deployment needs a shared store such as [`super::SqliteCommandStore`].

use super::{check_transition, CommandStore};
use crate::error::{BrokerError, Result};
use crate::models::{Command, CommandStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

struct Entry {
    /// Insertion order, breaks ties between equal timestamps.
    seq: u64,
    command: Command,
}

#[derive(Default)]
struct Inner {
    commands: HashMap<String, Entry>,
    next_seq: u64,
}

#[derive(Default)]
pub struct MemoryCommandStore {
    inner: Mutex<Inner>,
}

impl MemoryCommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CommandStore for MemoryCommandStore {
    async fn insert(&self, command: &Command) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.commands.contains_key(&command.id) {
            return Err(BrokerError::Storage(format!(
                "duplicate command id {}",
                command.id
            )));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.commands.insert(
            command.id.clone(),
            Entry {
                seq,
                command: command.clone(),
            },
        );
        Ok(())
    }

    async fn find(&self, id: &str, not_before: DateTime<Utc>) -> Result<Option<Command>> {
        let inner = self.inner.lock();
        Ok(inner
            .commands
            .get(id)
            .filter(|e| e.command.created_at >= not_before)
            .map(|e| e.command.clone()))
    }

    async fn claim_oldest_pending(
        &self,
        owner: &str,
        not_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Command>> {
        // Selection and the status flip happen under one lock.
        let mut inner = self.inner.lock();
        let oldest = inner
            .commands
            .values_mut()
            .filter(|e| {
                e.command.owner == owner
                    && e.command.status == CommandStatus::Pending
                    && e.command.created_at >= not_before
            })
            .min_by_key(|e| (e.command.created_at, e.seq));

        Ok(oldest.map(|entry| {
            entry.command.status = CommandStatus::Processing;
            entry.command.updated_at = now;
            entry.command.clone()
        }))
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
        let mut inner = self.inner.lock();
        let entry = inner
            .commands
            .get_mut(id)
            .filter(|e| e.command.created_at >= not_before)
            .ok_or_else(|| BrokerError::NotFound(id.to_string()))?;

        if entry.command.status != from {
            return Err(BrokerError::InvalidState {
                id: id.to_string(),
                status: entry.command.status,
                target: to,
            });
        }

        entry.command.status = to;
        entry.command.result = result;
        entry.command.updated_at = now;
        Ok(entry.command.clone())
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut inner = self.inner.lock();
        let before = inner.commands.len();
        inner.commands.retain(|_, e| e.command.created_at >= cutoff);
        Ok(before - inner.commands.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommandRequest;
    use chrono::TimeDelta;

    fn command(id: &str, owner: &str, at: DateTime<Utc>) -> Command {
        Command::new(id.into(), owner.into(), CommandRequest::FetchCode {}, at)
    }

    #[tokio::test]
    async fn test_claim_picks_oldest_for_owner() {
        let store = MemoryCommandStore::new();
        let t0 = Utc::now();
        let horizon = t0 - TimeDelta::hours(1);

        store.insert(&command("late", "a@x", t0 + TimeDelta::seconds(2))).await.unwrap();
        store.insert(&command("early", "a@x", t0)).await.unwrap();
        store.insert(&command("other", "b@x", t0 - TimeDelta::seconds(5))).await.unwrap();

        let first = store.claim_oldest_pending("a@x", horizon, t0).await.unwrap().unwrap();
        assert_eq!(first.id, "early");
        assert_eq!(first.status, CommandStatus::Processing);

        let second = store.claim_oldest_pending("a@x", horizon, t0).await.unwrap().unwrap();
        assert_eq!(second.id, "late");

        assert!(store.claim_oldest_pending("a@x", horizon, t0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_timestamp_uses_insertion_order() {
        let store = MemoryCommandStore::new();
        let t0 = Utc::now();
        for id in ["one", "two", "three"] {
            store.insert(&command(id, "a@x", t0)).await.unwrap();
        }
        let horizon = t0 - TimeDelta::hours(1);
        for expected in ["one", "two", "three"] {
            let claimed = store.claim_oldest_pending("a@x", horizon, t0).await.unwrap().unwrap();
            assert_eq!(claimed.id, expected);
        }
    }

    #[tokio::test]
    async fn test_transition_checks_current_status() {
        let store = MemoryCommandStore::new();
        let t0 = Utc::now();
        let horizon = t0 - TimeDelta::hours(1);
        store.insert(&command("c", "a@x", t0)).await.unwrap();

        let err = store
            .transition("c", CommandStatus::Processing, CommandStatus::Completed, None, horizon, t0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BrokerError::InvalidState { status: CommandStatus::Pending, .. }
        ));

        let err = store
            .transition("missing", CommandStatus::Pending, CommandStatus::Processing, None, horizon, t0)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transition_refuses_skipping_processing() {
        let store = MemoryCommandStore::new();
        let t0 = Utc::now();
        let horizon = t0 - TimeDelta::hours(1);
        store.insert(&command("c", "a@x", t0)).await.unwrap();

        let err = store
            .transition("c", CommandStatus::Pending, CommandStatus::Completed, None, horizon, t0)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidInput(_)));
        assert_eq!(
            store.find("c", horizon).await.unwrap().unwrap().status,
            CommandStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_purge_and_expiry_filter() {
        let store = MemoryCommandStore::new();
        let t0 = Utc::now();
        store.insert(&command("old", "a@x", t0 - TimeDelta::hours(2))).await.unwrap();
        store.insert(&command("new", "a@x", t0)).await.unwrap();

        let horizon = t0 - TimeDelta::hours(1);
        assert!(store.find("old", horizon).await.unwrap().is_none());
        assert!(store.find("new", horizon).await.unwrap().is_some());

        assert_eq!(store.purge_created_before(horizon).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryCommandStore::new();
        let t0 = Utc::now();
        store.insert(&command("dup", "a@x", t0)).await.unwrap();
        assert!(store.insert(&command("dup", "a@x", t0)).await.is_err());
    }
}
