//! Messenger webhook endpoints.

use axum::extract::{Query, State};
use axum::Json;
use messenger::{VerifyParams, WebhookBody};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Acknowledgement for a delivery.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    /// Events queued from this delivery.
    pub queued: usize,
}

/// Subscription handshake: echo the challenge when the token matches.
pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<String> {
    match params.challenge_for(&state.verify_token) {
        Some(challenge) => {
            info!("Webhook subscription verified");
            Ok(challenge.to_string())
        }
        None => Err(AppError::Forbidden),
    }
}

/// Event intake: queue every user message and postback, then acknowledge
/// without waiting for the turns to run.
pub async fn receive(
    State(state): State<AppState>,
    Json(body): Json<WebhookBody>,
) -> Result<Json<Ack>> {
    let events = body.events();
    debug!("Webhook delivery for {:?} with {} events", body.object, events.len());

    let queued = events.len();
    for event in events {
        state.dispatch.enqueue(event)?;
    }

    Ok(Json(Ack {
        success: true,
        queued,
    }))
}
