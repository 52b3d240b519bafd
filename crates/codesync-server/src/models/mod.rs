use chrono::{DateTime, Utc};
use codesync_diff::{smart_diff, EditOperation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a command. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// PENDING -> PROCESSING -> COMPLETED | FAILED, nothing else.
    pub fn can_transition_to(&self, next: CommandStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown command status: {}", other)),
        }
    }
}

/// The request kinds an issuer can queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    FetchCode,
    FetchLine,
    ApplyEdit,
    ApplyIncrementalEdit,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchCode => "FETCH_CODE",
            Self::FetchLine => "FETCH_LINE",
            Self::ApplyEdit => "APPLY_EDIT",
            Self::ApplyIncrementalEdit => "APPLY_INCREMENTAL_EDIT",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FETCH_CODE" => Ok(Self::FetchCode),
            "FETCH_LINE" => Ok(Self::FetchLine),
            "APPLY_EDIT" => Ok(Self::ApplyEdit),
            "APPLY_INCREMENTAL_EDIT" => Ok(Self::ApplyIncrementalEdit),
            other => Err(format!("unknown command type: {}", other)),
        }
    }
}

/// A command's kind together with its typed payload.
///
/// Wire form is `{ "type": "...", "payload": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandRequest {
    /// Read the whole editor buffer.
    FetchCode {},
    /// Read one 1-indexed line.
    FetchLine { line: usize },
    /// Replace the whole buffer.
    ApplyEdit { code: String },
    /// Apply an edit script, falling back to `full_code` if it does not fit.
    ApplyIncrementalEdit {
        changes: Vec<EditOperation>,
        #[serde(rename = "fullCode")]
        full_code: String,
    },
}

impl CommandRequest {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::FetchCode {} => CommandKind::FetchCode,
            Self::FetchLine { .. } => CommandKind::FetchLine,
            Self::ApplyEdit { .. } => CommandKind::ApplyEdit,
            Self::ApplyIncrementalEdit { .. } => CommandKind::ApplyIncrementalEdit,
        }
    }

    /// Rebuild a typed request from a kind and a loose JSON payload.
    pub fn from_parts(kind: CommandKind, payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json!({ "type": kind, "payload": payload }))
    }

    /// The JSON payload without its type tag.
    pub fn payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("payload").unwrap_or_else(|| json!({})),
            _ => json!({}),
        }
    }

    /// Diff `original` against `edited` and package the script together
    /// with the full text as a fallback.
    pub fn incremental_edit(original: &str, edited: &str) -> Self {
        let diff = smart_diff(original, original, edited);
        Self::ApplyIncrementalEdit {
            changes: diff.edit_script,
            full_code: edited.to_string(),
        }
    }
}

/// A persisted unit of cross-client work.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    /// Owner identity (the user's email); only the owner's pollers see it.
    #[serde(rename = "email")]
    pub owner: String,
    #[serde(flatten)]
    pub request: CommandRequest,
    pub status: CommandStatus,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Command {
    pub fn new(id: String, owner: String, request: CommandRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            request,
            status: CommandStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status_view(&self) -> CommandStatusView {
        CommandStatusView {
            status: self.status,
            result: self.result.clone(),
        }
    }

    pub fn claimed(&self) -> ClaimedCommand {
        ClaimedCommand {
            id: self.id.clone(),
            kind: self.request.kind(),
            payload: self.request.payload(),
        }
    }
}

/// What an issuer sees while polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandStatusView {
    pub status: CommandStatus,
    pub result: Option<Value>,
}

/// What a poller receives after a successful claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedCommand {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default)]
    pub payload: Value,
}

impl ClaimedCommand {
    pub fn request(&self) -> Result<CommandRequest, serde_json::Error> {
        let payload = if self.payload.is_null() {
            json!({})
        } else {
            self.payload.clone()
        };
        CommandRequest::from_parts(self.kind, payload)
    }
}

/// Result of `FETCH_CODE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchCodeResult {
    pub code: String,
}

/// Result of `FETCH_LINE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchLineResult {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    Incremental,
    Full,
}

/// Result of `APPLY_EDIT` and `APPLY_INCREMENTAL_EDIT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub mode: ApplyMode,
    pub line_count: usize,
}

// HTTP request/response bodies

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateCommandInput {
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommandResponse {
    pub message: String,
    pub command_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingQuery {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCommandResponse {
    pub message: String,
    pub command: Option<ClaimedCommand>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommandInput {
    pub command_id: Option<String>,
    pub status: Option<String>,
    pub result: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCommandResponse {
    pub message: String,
    pub command: Command,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "commandId")]
    pub command_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_edges() {
        use CommandStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Processing));
        assert!(Completed.is_terminal() && Failed.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            CommandStatus::Pending,
            CommandStatus::Processing,
            CommandStatus::Completed,
            CommandStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<CommandStatus>(), Ok(status));
        }
        assert!("DONE".parse::<CommandStatus>().is_err());
    }

    #[test]
    fn test_request_wire_shape() {
        let req = CommandRequest::FetchLine { line: 3 };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"type": "FETCH_LINE", "payload": {"line": 3}})
        );
        assert_eq!(req.payload(), json!({"line": 3}));
        assert_eq!(CommandRequest::FetchCode {}.payload(), json!({}));
    }

    #[test]
    fn test_from_parts() {
        let req = CommandRequest::from_parts(CommandKind::ApplyEdit, json!({"code": "x = 1"})).unwrap();
        assert_eq!(req, CommandRequest::ApplyEdit { code: "x = 1".into() });

        let req = CommandRequest::from_parts(CommandKind::FetchCode, json!({})).unwrap();
        assert_eq!(req.kind(), CommandKind::FetchCode);

        assert!(CommandRequest::from_parts(CommandKind::FetchLine, json!({})).is_err());
    }

    #[test]
    fn test_incremental_edit_payload() {
        let req = CommandRequest::incremental_edit("a\nb", "a\nc");
        let payload = req.payload();
        assert_eq!(payload["fullCode"], "a\nc");
        assert_eq!(payload["changes"][0]["type"], "replace");
        assert_eq!(payload["changes"][0]["line"], 2);
    }

    #[test]
    fn test_command_serializes_flat() {
        let now = Utc::now();
        let cmd = Command::new("id-1".into(), "dev@example.com".into(), CommandRequest::FetchCode {}, now);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "FETCH_CODE");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["email"], "dev@example.com");
        assert!(json["result"].is_null());
    }

    #[test]
    fn test_claimed_command_request() {
        let claimed = ClaimedCommand {
            id: "c1".into(),
            kind: CommandKind::FetchCode,
            payload: Value::Null,
        };
        assert_eq!(claimed.request().unwrap(), CommandRequest::FetchCode {});
    }
}
