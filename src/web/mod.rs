// Web server: Axum front for the relay pipeline.
//
// POST /api/message takes `{"message": "..."}` and answers either with a
// streamed text/plain reply or with `{"ok": false, "error": "..."}` and the
// status from the pipeline's Rejection. GET /health is for load balancers.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::ratelimit::limiter::spawn_sweeper;
use crate::relay::{Rejection, RelayPipeline};

pub mod handlers;
pub mod identity;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RelayPipeline>,
}

impl AppState {
    pub fn new(pipeline: RelayPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(config: Config, port: u16, bind: &str) -> Result<()> {
    config.require_openai()?;

    let pipeline = RelayPipeline::from_config(&config)?;
    let _sweeper = spawn_sweeper(pipeline.limiter().clone());
    let app = build_router(AppState::new(pipeline));

    let addr = format!("{bind}:{port}");
    info!("Chatguard relay listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/message", post(handlers::message::post_message))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check. Always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        axum::Json(serde_json::json!({ "ok": false, "error": message })),
    )
        .into_response()
}

/// HTTP status for a rejected message.
pub fn rejection_status(rejection: Rejection) -> StatusCode {
    match rejection {
        Rejection::InvalidPayload | Rejection::ProhibitedContent | Rejection::UnsafeContent => {
            StatusCode::BAD_REQUEST
        }
        Rejection::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        Rejection::SafetyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        Rejection::AssistantUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        api_error(rejection_status(self), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status_mapping() {
        assert_eq!(rejection_status(Rejection::InvalidPayload), StatusCode::BAD_REQUEST);
        assert_eq!(rejection_status(Rejection::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rejection_status(Rejection::ProhibitedContent), StatusCode::BAD_REQUEST);
        assert_eq!(
            rejection_status(Rejection::SafetyUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(rejection_status(Rejection::UnsafeContent), StatusCode::BAD_REQUEST);
        assert_eq!(
            rejection_status(Rejection::AssistantUnavailable),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rejection_renders_error_envelope() {
        let response = Rejection::SafetyUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "Unable to check message safety right now.");
    }
}
