//! HTTP application: webhook, dashboard and health routes on one router.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::dashboard::{DashboardState, dashboard_routes};
use crate::webhook::{WebhookState, webhook_routes};

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "lead-qualifier";

/// Build the full router.
pub fn build_router(webhook: WebhookState, dashboard: DashboardState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(webhook_routes(webhook))
        .merge(dashboard_routes(dashboard))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::dashboard::LeadReader;
    use crate::handoff::HandoffCoordinator;
    use crate::pipeline::IntakeQueue;
    use crate::store::MemoryStore;

    fn app() -> Router {
        let store = Arc::new(MemoryStore::with_header());
        let (queue, _rx) = IntakeQueue::new(4);
        build_router(
            WebhookState {
                verify_token: Arc::new(SecretString::from("t")),
                queue,
            },
            DashboardState {
                handoff: Arc::new(HandoffCoordinator::new(store.clone())),
                reader: Arc::new(LeadReader::new(store)),
            },
        )
    }

    #[tokio::test]
    async fn health_reports_service() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], SERVICE_NAME);
    }

    #[tokio::test]
    async fn all_route_groups_are_mounted() {
        let app = app();
        for uri in ["/webhook", "/api/leads"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_ne!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
        let response = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
