//! Handlers for server

pub mod commands;

// Re-export AppState from config
pub use crate::config::AppState;

pub use commands::{command_status, create_command, pending_commands, update_command};
