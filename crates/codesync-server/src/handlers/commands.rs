//! Command queue endpoints.
//!
//! The web client uses `create-command` and `command-status`; the editor
//! agent uses `pending-commands` and `update-command`.

use crate::config::AppState;
use crate::error::ApiError;
use crate::models::{
    CommandKind, CommandRequest, CommandStatus, CommandStatusView, CreateCommandInput,
    CreateCommandResponse, PendingCommandResponse, PendingQuery, StatusQuery, UpdateCommandInput,
    UpdateCommandResponse,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use std::str::FromStr;
use tracing::info;

fn required(value: Option<String>, what: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", what)))
}

/// POST /create-command
pub async fn create_command(
    State(state): State<AppState>,
    Json(input): Json<CreateCommandInput>,
) -> Result<(StatusCode, Json<CreateCommandResponse>), ApiError> {
    let (Some(email), Some(kind)) = (
        input.email.filter(|e| !e.trim().is_empty()),
        input.kind.filter(|k| !k.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Email and type are required".to_string()));
    };

    let kind = CommandKind::from_str(&kind).map_err(ApiError::BadRequest)?;
    let payload = input.payload.unwrap_or_else(|| json!({}));
    let request = CommandRequest::from_parts(kind, payload)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {} payload: {}", kind, e)))?;

    info!("POST /create-command {} for {}", kind, email);
    let command_id = state.broker.create(&email, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCommandResponse {
            message: "Command created successfully".to_string(),
            command_id,
        }),
    ))
}

/// GET /pending-commands?email=
///
/// Claims at most one command; it is PROCESSING by the time it is returned.
pub async fn pending_commands(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<PendingCommandResponse>, ApiError> {
    let email = required(query.email, "Email")?;

    let response = match state.broker.claim_next(&email).await? {
        Some(command) => PendingCommandResponse {
            message: "Fetched pending command".to_string(),
            command: Some(command.claimed()),
        },
        None => PendingCommandResponse {
            message: "No pending commands".to_string(),
            command: None,
        },
    };
    Ok(Json(response))
}

/// POST /update-command
pub async fn update_command(
    State(state): State<AppState>,
    Json(input): Json<UpdateCommandInput>,
) -> Result<Json<UpdateCommandResponse>, ApiError> {
    let (Some(command_id), Some(status)) = (
        input.command_id.filter(|c| !c.trim().is_empty()),
        input.status.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "commandId and status are required".to_string(),
        ));
    };

    let status = CommandStatus::from_str(&status).map_err(ApiError::BadRequest)?;
    info!("POST /update-command {} -> {}", command_id, status);

    let command = state
        .broker
        .post_result(&command_id, status, input.result)
        .await?;

    Ok(Json(UpdateCommandResponse {
        message: "Command updated successfully".to_string(),
        command,
    }))
}

/// GET /command-status?commandId=
pub async fn command_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<CommandStatusView>, ApiError> {
    let command_id = required(query.command_id, "commandId")?;
    Ok(Json(state.broker.status(&command_id).await?))
}
