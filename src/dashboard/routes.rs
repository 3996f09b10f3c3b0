//! Dashboard REST routes.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use super::reader::LeadReader;
use crate::error::HandoffError;
use crate::handoff::HandoffCoordinator;

/// Shared state for dashboard handlers.
#[derive(Clone)]
pub struct DashboardState {
    pub handoff: Arc<HandoffCoordinator>,
    pub reader: Arc<LeadReader>,
}

/// Build the dashboard router with permissive CORS.
pub fn dashboard_routes(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/handoff", post(resolve_handoff))
        .route("/api/leads", get(list_leads))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandoffRequest {
    #[serde(default, alias = "waId")]
    sender_id: Option<String>,
}

fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
}

async fn resolve_handoff(
    State(state): State<DashboardState>,
    payload: Result<Json<HandoffRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected handoff request body");
            return bad_request("Request body must be JSON with a senderId");
        }
    };

    let sender_id = match request.sender_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return bad_request("senderId is required"),
    };

    match state.handoff.resolve(&sender_id).await {
        Ok(row) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": format!("Handoff for {sender_id} marked Resolved at row {row}"),
                "row": row.get(),
            })),
        ),
        Err(e @ HandoffError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": e.to_string() })),
        ),
        Err(HandoffError::Store(e)) => {
            error!(sender = %sender_id, error = %e, "Handoff resolve failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("Failed to update lead: {e}") })),
            )
        }
    }
}

async fn list_leads(State(state): State<DashboardState>) -> impl IntoResponse {
    match state.reader.read_all().await {
        Ok(leads) => (StatusCode::OK, Json(serde_json::json!({ "leads": leads }))),
        Err(e) => {
            error!(error = %e, "Failed to read leads");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("Failed to read leads: {e}") })),
            )
        }
    }
}
