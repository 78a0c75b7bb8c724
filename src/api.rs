//! HTTP surface for the intake server.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /mcp` – JSON-RPC 2.0 endpoint. Requests pass origin, protocol-version, `Accept`,
//!   body, and session validation (in that order) before being dispatched to
//!   [`IntakeMcpServer::dispatch`]. Requests without an `id` are acknowledged with `202`.
//! - `GET /mcp` – Reserved for event streaming, which this server does not offer (`405`).
//! - `GET /health` – Liveness probe with ingestion counters.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rmcp::{ErrorData as McpError, model::ErrorCode};
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::mcp::{
    IntakeMcpServer, PROTOCOL_VERSION,
    jsonrpc::{failure, is_notification, normalize_id, success},
};
use crate::metrics::MetricsSnapshot;

const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";
const SESSION_HEADER: &str = "mcp-session-id";
const JSON_MEDIA_TYPE: &str = "application/json";
const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";
const ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost",
    "https://localhost",
    "http://127.0.0.1",
    "https://127.0.0.1",
];

/// Build the HTTP router exposing the protocol endpoint and the health probe.
pub fn create_router(server: Arc<IntakeMcpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_post).get(handle_get))
        .route("/health", get(health))
        .with_state(server)
}

/// Whether `origin` is a loopback origin, optionally with a numeric port.
pub fn is_allowed_origin(origin: &str) -> bool {
    ALLOWED_ORIGINS.iter().any(|allowed| {
        origin.strip_prefix(allowed).is_some_and(|rest| {
            rest.is_empty()
                || rest.strip_prefix(':').is_some_and(|port| {
                    !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
                })
        })
    })
}

async fn handle_post(
    State(server): State<Arc<IntakeMcpServer>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(rejection) = reject_origin(&headers) {
        return rejection;
    }

    if let Some(version) = header(&headers, PROTOCOL_VERSION_HEADER) {
        if version != PROTOCOL_VERSION {
            tracing::warn!(version, "Unsupported protocol version");
            return error_response(
                StatusCode::BAD_REQUEST,
                None,
                invalid_request(format!("Unsupported protocol version: {version}")),
            );
        }
    }

    let accept = header(&headers, "accept").unwrap_or_default();
    if !accept.contains(JSON_MEDIA_TYPE) && !accept.contains(EVENT_STREAM_MEDIA_TYPE) {
        return error_response(
            StatusCode::BAD_REQUEST,
            None,
            invalid_request(format!(
                "Accept header must include {JSON_MEDIA_TYPE} or {EVENT_STREAM_MEDIA_TYPE}"
            )),
        );
    }

    let request = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(request)) => request,
        Ok(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                None,
                invalid_request("Invalid Request: expected a JSON object".into()),
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "Unparseable request body");
            return error_response(
                StatusCode::BAD_REQUEST,
                None,
                McpError::new(ErrorCode::PARSE_ERROR, format!("Parse error: {err}"), None),
            );
        }
    };

    let method = request.get("method").and_then(Value::as_str);

    if method != Some("initialize") {
        if let Some(session_id) = header(&headers, SESSION_HEADER) {
            if !server.services().sessions.contains(session_id) {
                tracing::warn!(session_id, method = method.unwrap_or_default(), "Unknown session");
                return error_response(
                    StatusCode::NOT_FOUND,
                    None,
                    invalid_request("Session not found".into()),
                );
            }
        }
    }

    if is_notification(&request) {
        tracing::info!(method = method.unwrap_or_default(), "Notification accepted");
        return StatusCode::ACCEPTED.into_response();
    }

    let Some(method) = method else {
        return error_response(
            StatusCode::BAD_REQUEST,
            request.get("id").cloned().map(normalize_id),
            invalid_request("Invalid Request: missing method".into()),
        );
    };

    let id = normalize_id(request.get("id").cloned().unwrap_or(Value::Null));
    let params = request.get("params").filter(|params| !params.is_null()).cloned();
    tracing::info!(method, "Request received");

    match server.dispatch(method, params).await {
        Ok(reply) => {
            let mut response = (StatusCode::OK, Json(success(id, reply.result))).into_response();
            if let Some(session_id) = reply.session_id {
                match HeaderValue::from_str(&session_id) {
                    Ok(value) => {
                        response
                            .headers_mut()
                            .insert(HeaderName::from_static(SESSION_HEADER), value);
                    }
                    Err(err) => tracing::error!(error = %err, "Session id is not a header value"),
                }
            }
            response
        }
        Err(error) => {
            tracing::warn!(method, code = error.code.0, message = %error.message, "Request failed");
            error_response(StatusCode::OK, Some(id), error)
        }
    }
}

async fn handle_get(headers: HeaderMap) -> Response {
    if let Some(rejection) = reject_origin(&headers) {
        return rejection;
    }

    let accept = header(&headers, "accept").unwrap_or_default();
    if !accept.contains(EVENT_STREAM_MEDIA_TYPE) {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    }
    (
        StatusCode::METHOD_NOT_ALLOWED,
        "SSE streaming not supported. Use POST for requests.",
    )
        .into_response()
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    /// Milliseconds since the Unix epoch.
    timestamp: i64,
    metrics: MetricsSnapshot,
}

async fn health(State(server): State<Arc<IntakeMcpServer>>) -> Json<HealthResponse> {
    let timestamp = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp,
        metrics: server.services().metrics.snapshot(),
    })
}

/// Header value as text; a value that is not visible ASCII reads as empty.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default())
}

fn reject_origin(headers: &HeaderMap) -> Option<Response> {
    let origin = header(headers, "origin")?;
    if is_allowed_origin(origin) {
        return None;
    }
    tracing::warn!(origin, "Rejected origin");
    Some((StatusCode::FORBIDDEN, "Forbidden").into_response())
}

fn invalid_request(message: String) -> McpError {
    McpError::new(ErrorCode::INVALID_REQUEST, message, None)
}

fn error_response(status: StatusCode, id: Option<Value>, error: McpError) -> Response {
    (status, Json(failure(id, &error))).into_response()
}
