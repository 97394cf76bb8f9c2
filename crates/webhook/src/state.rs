//! Application state shared across handlers.

use std::sync::Arc;

use orchestrator::DispatchHandle;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Token expected in the subscription handshake.
    pub verify_token: Arc<str>,
    /// Producer side of the turn queue.
    pub dispatch: DispatchHandle,
}

impl AppState {
    /// Create new application state.
    pub fn new(verify_token: impl Into<Arc<str>>, dispatch: DispatchHandle) -> Self {
        Self {
            verify_token: verify_token.into(),
            dispatch,
        }
    }
}
