//! Request pipeline middleware
//!
//! Outermost to innermost: rate limiting, API version echo, idempotent POST
//! handling. Each runs through `axum::middleware::from_fn[_with_state]`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::LengthLimitError;
use serde_json::json;
use tracing::{debug, error};

use crate::application::ports::outbound::StoredResponse;
use crate::application::services::{Admission, IdempotencyService};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::state::AppState;

pub const API_VERSION: HeaderName = HeaderName::from_static("x-api-version");
pub const RATE_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

const DEFAULT_API_VERSION: &str = "1";

/// First `X-Forwarded-For` hop, else the peer address
fn client_id(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match forwarded {
        Some(ip) => ip.to_string(),
        None => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Fixed-window admission with `X-RateLimit-*` headers on every response
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_id(&request);
    let decision = state.rate_limiter.admit(&client).await;

    let mut response = if decision.is_allowed() {
        next.run(request).await
    } else {
        let body = json!({
            "error": "Too many requests, please try again later.",
            "X-RateLimit-Limit": decision.limit(),
            "X-RateLimit-Remaining": 0,
        });
        (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
    };

    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT, HeaderValue::from(decision.limit()));
    headers.insert(RATE_REMAINING, HeaderValue::from(decision.remaining()));
    if let Some(secs) = decision.retry_after_secs() {
        headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}

/// Echo the requested API version, defaulting to 1
pub async fn api_version(request: Request, next: Next) -> Response {
    let version = request
        .headers()
        .get(&API_VERSION)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_API_VERSION));

    let mut response = next.run(request).await;
    response.headers_mut().insert(API_VERSION, version);
    response
}

/// 413 when the body ran past `limit`, 400 when the stream itself failed
fn body_read_error(err: axum::Error, limit: usize) -> ApiError {
    let inner = err.into_inner();
    if inner.is::<LengthLimitError>() {
        debug!(limit, "Rejecting oversized body");
        ApiError::PayloadTooLarge(limit)
    } else {
        debug!(error = %inner, "Rejecting unreadable body");
        ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: format!("failed to read request body: {inner}"),
        }
    }
}

fn replay(stored: StoredResponse) -> Response {
    let mut response = (StatusCode::CONFLICT, stored.body).into_response();
    if let Some(value) = stored
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

/// Run each distinct POST body at most once
///
/// A repeated body gets the first response's body back with 409. The body is
/// buffered up to the configured limit; larger bodies are refused with 413.
/// If the response never gets built, the dropped reservation is released.
pub async fn idempotency(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !IdempotencyService::applies_to(request.method().as_str()) {
        return next.run(request).await;
    }

    let limit = state.config.max_body_bytes;
    let (parts, body) = request.into_parts();
    let bytes = match body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => return body_read_error(e, limit).into_response(),
    };

    let pending = match state.idempotency.begin(&bytes).await {
        Admission::Proceed(pending) => pending,
        Admission::Replay(stored) => return replay(stored),
        Admission::InFlight => {
            return ApiError::Conflict(
                "request with identical body is already being processed".to_string(),
            )
            .into_response()
        }
    };

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (parts, body) = response.into_parts();
    match body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let stored = StoredResponse {
                status: parts.status.as_u16(),
                content_type: parts
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string),
                body: bytes.to_vec(),
            };
            pending.complete(stored).await;
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            error!(
                fingerprint = %pending.fingerprint(),
                error = %e,
                "Failed to buffer response for idempotency store"
            );
            pending.abandon().await;
            ApiError::Internal("failed to read response body".to_string()).into_response()
        }
    }
}
