// POST /api/message: moderate a message and stream the model's reply.
//
// The body is parsed by hand rather than with the Json extractor so that a
// missing content-type, bad JSON, or a non-string `message` all get the same
// `{"ok": false, "error": ...}` 400 as any other invalid payload.
//
// On success the reply is streamed as text/plain with no envelope. The body
// stream owns the upstream connection: if the client disconnects, hyper drops
// the body and generation stops being read.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde::Deserialize;

use crate::relay::{Outcome, Rejection};
use crate::web::identity::client_identity;
use crate::web::AppState;

#[derive(Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// POST /api/message: run the relay pipeline for one message.
pub async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let identity = client_identity(&headers);

    let request: MessageRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, identity = %identity, "Unparseable message payload");
            return Rejection::InvalidPayload.into_response();
        }
    };

    match state.pipeline.handle(&identity, &request.message).await {
        Outcome::Rejected(rejection) => rejection.into_response(),
        Outcome::Stream(chunks) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Body::from_stream(chunks.map(Ok::<_, Infallible>)),
        )
            .into_response(),
    }
}
