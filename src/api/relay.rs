//! Relay endpoint — stateless pass-through between the chat client and the
//! upstream provider.
//!
//! The relay exists so the browser-side caller never talks to the provider
//! across origins; it forwards the request with the caller's credential and
//! pipes the SSE response body back byte for byte. No retries, no buffering
//! beyond pass-through, no state across requests.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::llm::anthropic::{MessagesRequest, WireMessage, ANTHROPIC_VERSION, DEFAULT_MODEL};

/// Shared relay state: one HTTP client and the upstream base URL
/// (injectable so tests can point at a local mock).
#[derive(Clone)]
pub struct RelayState {
    pub http: reqwest::Client,
    pub upstream_url: String,
}

impl RelayState {
    pub fn new(upstream_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            upstream_url: upstream_url.into(),
        }
    }
}

/// Request body from the chat client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the relay router.
pub fn relay_router(state: RelayState) -> Router {
    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// `POST /api/chat` — forward a chat request upstream and stream the
/// response back.
async fn handle_chat(State(state): State<RelayState>, Json(req): Json<RelayRequest>) -> Response {
    // Credential check happens before any upstream contact
    if req.api_key.trim().is_empty() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "API key required".into(),
            }),
        )
            .into_response();
    }

    let model = req.model.as_deref().unwrap_or(DEFAULT_MODEL);
    let body = MessagesRequest::streaming(model, &req.messages);

    let upstream = state
        .http
        .post(format!("{}/v1/messages", state.upstream_url))
        .header("x-api-key", &req.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body)
        .send()
        .await;

    let response = match upstream {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Upstream request failed: {e}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    let status = response.status();
    if !status.is_success() {
        // Mirror the upstream status and error payload verbatim
        let error = response.text().await.unwrap_or_default();
        tracing::warn!(%status, "Upstream returned error");
        return (status, Json(ErrorResponse { error })).into_response();
    }

    // Pipe the SSE body through unmodified
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(response.bytes_stream()),
    )
        .into_response()
}
