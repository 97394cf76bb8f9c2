//! Error types for report-flow.

use thiserror::Error;

/// Failures surfaced by the flow.
///
/// The state machine itself never fails; these wrap errors from the
/// collaborators it reads from while rendering a reply.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Report history could not be loaded.
    #[error("report history unavailable: {0}")]
    History(String),

    /// Preference could not be read or written.
    #[error("preference store failed: {0}")]
    Preference(String),

    /// Conversation or report storage failed.
    #[error("store failed: {0}")]
    Store(String),
}

/// Result type for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
