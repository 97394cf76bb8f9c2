//! Error types for orchestrator operations.

use database::DatabaseError;
use report_flow::FlowError;
use thiserror::Error;

/// Errors that can occur while running a turn.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Message was intentionally skipped.
    #[error("message skipped: {0}")]
    Skipped(String),

    /// The conversation core or one of its stores failed.
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),

    /// The database could not be opened or migrated.
    #[error("store error: {0}")]
    Store(#[from] DatabaseError),

    /// An attachment could not be stored.
    #[error("media error: {0}")]
    Media(String),

    /// Message sending failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The turn queue is full or closed.
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}
