//! Auth API endpoints.

use crate::auth::credentials::verify_credentials;
use crate::auth::middleware::{AppState, BearerToken, ClientKey};
use crate::auth::token;
use crate::error::AppError;
use crate::models::{Credentials, TokenClaims};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Largest accepted `/auth` body, in bytes.
pub const MAX_BODY_BYTES: usize = 1024;

/// POST /auth — Exchange username/password for an encrypted token
///
/// The rate limiter is consulted first and counts every request, so the
/// `X-RateLimit-*` headers are attached whatever the outcome.
pub async fn authenticate(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    request: Request,
) -> Response {
    let result = if state.limiter.is_rate_limited(&client) {
        tracing::warn!(action = "rate_limited", endpoint = "auth", client_hash = %client_hash(&client), "Rate limit exceeded");
        Err(AppError::RateLimited)
    } else {
        issue_token(&state, &client, request).await
    };

    let mut response = result.into_response();
    state.limiter.apply_headers(response.headers_mut(), &client);
    response
}

async fn issue_token(
    state: &AppState,
    client: &str,
    request: Request,
) -> Result<Json<String>, AppError> {
    let (parts, body) = request.into_parts();

    require_json(&parts.headers)?;
    if declared_length(&parts.headers).is_some_and(|len| len > MAX_BODY_BYTES as u64) {
        return Err(AppError::PayloadTooLarge);
    }

    // Body delivery can stall if the client hangs up mid-upload
    let bytes = tokio::time::timeout(
        state.config.body_timeout,
        axum::body::to_bytes(body, MAX_BODY_BYTES),
    )
    .await
    .map_err(|_| AppError::Timeout)?
    .map_err(|e| AppError::BadRequest(format!("Request body too large or unreadable: {}", e)))?;

    let credentials: Credentials = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    credentials.validate().map_err(AppError::BadRequest)?;

    // bcrypt is deliberately slow; keep it off the async workers
    let config = Arc::clone(&state.config);
    let Credentials { username, password } = credentials;
    let valid = tokio::task::spawn_blocking(move || {
        verify_credentials(&username, &password, &config.account)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Credential check panicked: {}", e)))?;

    if !valid {
        tracing::warn!(action = "auth_failed", client_hash = %client_hash(client), "Invalid credentials");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let account = &state.config.account;
    let token = token::issue(&account.username, &state.key, &state.config.expiration)?;

    tracing::info!(action = "auth_success", username = %account.username, expires_in = %state.config.expiration, "Token issued");

    Ok(Json(token))
}

/// POST /auth/bearer — Decrypt a bearer token and return its claims
pub async fn bearer_auth(BearerToken(claims): BearerToken) -> Json<TokenClaims> {
    tracing::info!(action = "bearer_verified", username = %claims.username, "Bearer token accepted");
    Json(claims)
}

fn require_json(headers: &HeaderMap) -> Result<(), AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mime = content_type.split(';').next().unwrap_or_default().trim();

    if !mime.eq_ignore_ascii_case("application/json") {
        return Err(AppError::BadRequest(
            "Content-Type must be application/json".to_string(),
        ));
    }
    Ok(())
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Short non-reversible tag for a client key, for logs.
fn client_hash(client: &str) -> String {
    let mut hasher = std::hash::DefaultHasher::new();
    client.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}
