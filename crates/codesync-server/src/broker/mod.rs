//! Command broker: the only write path for command state.
//!
//! Issuers `create` commands and poll `status`; the other side polls
//! `claim_next`, does the work and calls `post_result`. Records older than
//! the TTL are invisible to every operation regardless of status. A command
//! stuck in PROCESSING (claimant crashed) is never requeued; it simply ages
//! out.

pub mod clock;

use crate::error::{BrokerError, Result};
use crate::models::{Command, CommandRequest, CommandStatus, CommandStatusView};
use crate::store::CommandStore;
use chrono::{DateTime, TimeDelta, Utc};
use clock::{Clock, SystemClock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use clock::ManualClock;

/// Default command lifetime: one hour.
pub const DEFAULT_COMMAND_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct CommandBroker {
    store: Arc<dyn CommandStore>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl CommandBroker {
    pub fn new(store: Arc<dyn CommandStore>, ttl: Duration) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), ttl)
    }

    pub fn with_clock(store: Arc<dyn CommandStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Oldest creation time still considered live at `now`.
    fn not_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Queue a command for `owner`. Returns its id.
    pub async fn create(&self, owner: &str, request: CommandRequest) -> Result<String> {
        let owner = validate_owner(owner)?;
        let now = self.clock.now();
        let command = Command::new(Uuid::new_v4().to_string(), owner.to_string(), request, now);

        self.store.insert(&command).await?;
        info!(
            command_id = %command.id,
            owner = %command.owner,
            kind = %command.request.kind(),
            "command created"
        );
        Ok(command.id)
    }

    /// Claim the oldest PENDING command of `owner`, if any.
    ///
    /// Exactly one of several concurrent callers wins a given command.
    pub async fn claim_next(&self, owner: &str) -> Result<Option<Command>> {
        let owner = validate_owner(owner)?;
        let now = self.clock.now();
        let claimed = self
            .store
            .claim_oldest_pending(owner, self.not_before(now), now)
            .await?;

        match &claimed {
            Some(cmd) => info!(command_id = %cmd.id, owner, kind = %cmd.request.kind(), "command claimed"),
            None => debug!(owner, "no pending commands"),
        }
        Ok(claimed)
    }

    /// Claim one specific command. Fails loudly if it is not PENDING.
    pub async fn claim(&self, id: &str) -> Result<Command> {
        let now = self.clock.now();
        let claimed = self
            .store
            .transition(
                id,
                CommandStatus::Pending,
                CommandStatus::Processing,
                None,
                self.not_before(now),
                now,
            )
            .await
            .inspect_err(|e| warn!(command_id = id, error = %e, "claim rejected"))?;

        info!(command_id = id, "command claimed by id");
        Ok(claimed)
    }

    /// Record the outcome of a PROCESSING command.
    pub async fn post_result(
        &self,
        id: &str,
        status: CommandStatus,
        result: Option<Value>,
    ) -> Result<Command> {
        if !CommandStatus::Processing.can_transition_to(status) {
            return Err(BrokerError::InvalidInput(format!(
                "result status must be COMPLETED or FAILED, got {}",
                status
            )));
        }

        let now = self.clock.now();
        let updated = self
            .store
            .transition(
                id,
                CommandStatus::Processing,
                status,
                result,
                self.not_before(now),
                now,
            )
            .await
            .inspect_err(|e| warn!(command_id = id, error = %e, "result rejected"))?;

        info!(command_id = id, status = %updated.status, "command finished");
        Ok(updated)
    }

    /// Fetch a live command.
    pub async fn get(&self, id: &str) -> Result<Command> {
        let now = self.clock.now();
        self.store
            .find(id, self.not_before(now))
            .await?
            .ok_or_else(|| BrokerError::NotFound(id.to_string()))
    }

    /// Status and result of a command, for issuers polling for completion.
    pub async fn status(&self, id: &str) -> Result<CommandStatusView> {
        Ok(self.get(id).await?.status_view())
    }

    /// Delete expired records from the store.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let purged = self.store.purge_created_before(self.not_before(now)).await?;
        if purged > 0 {
            info!(purged, "expired commands purged");
        }
        Ok(purged)
    }
}

fn validate_owner(owner: &str) -> Result<&str> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(BrokerError::InvalidInput("owner is required".to_string()));
    }
    Ok(owner)
}
