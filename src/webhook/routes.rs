//! `/webhook` handlers.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use secrecy::SecretString;
use tracing::{debug, error, info, warn};

use super::{EVENT_RECEIVED, VerifyQuery, extract_message, verify};
use crate::error::VerificationError;
use crate::pipeline::queue::IntakeQueue;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub verify_token: Arc<SecretString>,
    pub queue: IntakeQueue,
}

/// Build the webhook router: `GET` handshake, `POST` delivery.
pub fn webhook_routes(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify_subscription).post(receive_delivery))
        .with_state(state)
}

fn rejection_status(err: &VerificationError) -> StatusCode {
    match err {
        VerificationError::MissingParameters | VerificationError::MissingChallenge => {
            StatusCode::BAD_REQUEST
        }
        VerificationError::ModeMismatch | VerificationError::TokenMismatch => {
            StatusCode::FORBIDDEN
        }
    }
}

async fn verify_subscription(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyQuery>,
) -> impl IntoResponse {
    match verify(&params, &state.verify_token) {
        Ok(challenge) => {
            info!("Webhook subscription verified");
            (StatusCode::OK, challenge)
        }
        Err(e) => {
            warn!(error = %e, "Webhook verification rejected");
            (rejection_status(&e), e.to_string())
        }
    }
}

/// Always acknowledges; processing happens on the intake worker.
async fn receive_delivery(State(state): State<WebhookState>, body: Bytes) -> impl IntoResponse {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Ignoring unparseable webhook body");
            return (StatusCode::OK, EVENT_RECEIVED);
        }
    };

    match extract_message(&payload) {
        Some(lead) => {
            let id = lead.id.clone();
            if let Err(e) = state.queue.enqueue(lead).await {
                error!(message_id = %id, error = %e, "Failed to enqueue lead");
            }
        }
        None => debug!(object = ?payload.get("object"), "Delivery carried no text message"),
    }

    (StatusCode::OK, EVENT_RECEIVED)
}
