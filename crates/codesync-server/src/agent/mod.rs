//! Editor-side command execution.
//!
//! The agent polls the broker on behalf of one user, runs each claimed
//! command against the open buffer and reports the outcome.

use crate::client::{ClientError, CommandClient};
use crate::models::{
    ApplyMode, ApplyResult, ClaimedCommand, CommandRequest, CommandStatus, FetchCodeResult,
    FetchLineResult,
};
use codesync_diff::{apply_edit_script, split_lines};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

/// A text buffer the agent can read and overwrite.
pub trait EditorBuffer: Send {
    fn text(&self) -> String;
    fn set_text(&mut self, text: String);
}

/// In-memory buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl EditorBuffer for TextBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Line {line} is out of range (buffer has {count} lines)")]
    LineOutOfRange { line: usize, count: usize },

    #[error("Malformed {kind} payload: {message}")]
    Payload { kind: String, message: String },
}

/// Run one request against `buffer` and return the JSON result.
pub fn execute<B: EditorBuffer + ?Sized>(
    buffer: &mut B,
    request: &CommandRequest,
) -> Result<Value, AgentError> {
    let result = match request {
        CommandRequest::FetchCode {} => json!(FetchCodeResult {
            code: buffer.text()
        }),
        CommandRequest::FetchLine { line } => {
            let text = buffer.text();
            let lines = split_lines(&text);
            let found = line
                .checked_sub(1)
                .and_then(|i| lines.get(i))
                .ok_or(AgentError::LineOutOfRange {
                    line: *line,
                    count: lines.len(),
                })?;
            json!(FetchLineResult {
                line: *line,
                text: found.to_string(),
            })
        }
        CommandRequest::ApplyEdit { code } => {
            buffer.set_text(code.clone());
            json!(ApplyResult {
                mode: ApplyMode::Full,
                line_count: split_lines(code).len(),
            })
        }
        CommandRequest::ApplyIncrementalEdit { changes, full_code } => {
            let current = buffer.text();
            let (text, mode) = match apply_edit_script(&split_lines(&current), changes) {
                Ok(lines) => (lines.join("\n"), ApplyMode::Incremental),
                Err(e) => {
                    warn!(error = %e, "edit script does not apply, replacing whole buffer");
                    (full_code.clone(), ApplyMode::Full)
                }
            };
            let line_count = split_lines(&text).len();
            buffer.set_text(text);
            json!(ApplyResult { mode, line_count })
        }
    };
    Ok(result)
}

/// Polls for one owner's commands and executes them against a buffer.
pub struct EditorAgent<B: EditorBuffer> {
    client: CommandClient,
    owner: String,
    buffer: B,
}

impl<B: EditorBuffer> EditorAgent<B> {
    pub fn new(client: CommandClient, owner: impl Into<String>, buffer: B) -> Self {
        Self {
            client,
            owner: owner.into(),
            buffer,
        }
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Claim and run at most one command. Returns the command that was
    /// handled, or `None` when nothing was pending.
    pub async fn poll_once(&mut self) -> Result<Option<ClaimedCommand>, ClientError> {
        let Some(claimed) = self.client.pending_command(&self.owner).await? else {
            return Ok(None);
        };

        let outcome = claimed
            .request()
            .map_err(|e| AgentError::Payload {
                kind: claimed.kind.to_string(),
                message: e.to_string(),
            })
            .and_then(|request| execute(&mut self.buffer, &request));

        match outcome {
            Ok(result) => {
                info!(command_id = %claimed.id, kind = %claimed.kind, "command executed");
                self.client
                    .update_command(&claimed.id, CommandStatus::Completed, Some(result))
                    .await?;
            }
            Err(e) => {
                warn!(command_id = %claimed.id, kind = %claimed.kind, error = %e, "command failed");
                self.client
                    .update_command(
                        &claimed.id,
                        CommandStatus::Failed,
                        Some(json!({ "error": e.to_string() })),
                    )
                    .await?;
            }
        }
        Ok(Some(claimed))
    }
}
