//! HTTP client for the command queue.
//!
//! Used by both sides of the exchange: issuers create commands and wait for
//! their outcome, editor agents claim work and post results.

use crate::models::{
    ClaimedCommand, CommandRequest, CommandStatus, CommandStatusView, CreateCommandResponse,
    PendingCommandResponse,
};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Command {id} did not finish after {attempts} polls")]
    Timeout { id: String, attempts: u32 },
}

/// How long `wait_for_terminal` keeps polling.
#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CommandClient {
    http: Client,
    base_url: String,
}

impl CommandClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ClientError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse_with_params(&raw, params).map_err(|e| ClientError::Url(e.to_string()))
    }

    /// Queue a command for `email` and return its id.
    pub async fn create_command(
        &self,
        email: &str,
        request: &CommandRequest,
    ) -> Result<String, ClientError> {
        let body = json!({
            "email": email,
            "type": request.kind(),
            "payload": request.payload(),
        });
        let resp = self
            .http
            .post(self.url("/create-command", &[])?)
            .json(&body)
            .send()
            .await?;
        let created: CreateCommandResponse = decode(resp).await?;
        debug!(command_id = %created.command_id, "created command");
        Ok(created.command_id)
    }

    /// Claim the next pending command for `email`, if there is one.
    pub async fn pending_command(&self, email: &str) -> Result<Option<ClaimedCommand>, ClientError> {
        let resp = self
            .http
            .get(self.url("/pending-commands", &[("email", email)])?)
            .send()
            .await?;
        let pending: PendingCommandResponse = decode(resp).await?;
        Ok(pending.command)
    }

    /// Post the outcome of a claimed command.
    pub async fn update_command(
        &self,
        command_id: &str,
        status: CommandStatus,
        result: Option<Value>,
    ) -> Result<(), ClientError> {
        let body = json!({
            "commandId": command_id,
            "status": status,
            "result": result,
        });
        let resp = self
            .http
            .post(self.url("/update-command", &[])?)
            .json(&body)
            .send()
            .await?;
        let _: Value = decode(resp).await?;
        Ok(())
    }

    pub async fn command_status(&self, command_id: &str) -> Result<CommandStatusView, ClientError> {
        let resp = self
            .http
            .get(self.url("/command-status", &[("commandId", command_id)])?)
            .send()
            .await?;
        decode(resp).await
    }

    /// Poll until the command is COMPLETED or FAILED.
    pub async fn wait_for_terminal(
        &self,
        command_id: &str,
        poll: PollConfig,
    ) -> Result<CommandStatusView, ClientError> {
        for attempt in 0..poll.max_attempts {
            let view = self.command_status(command_id).await?;
            if view.status.is_terminal() {
                return Ok(view);
            }
            debug!(command_id, attempt, status = %view.status, "still waiting");
            tokio::time::sleep(poll.interval).await;
        }
        Err(ClientError::Timeout {
            id: command_id.to_string(),
            attempts: poll.max_attempts,
        })
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let body: Value = resp.json().await.unwrap_or(Value::Null);
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or("unknown error")
        .to_string();
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
