//! Shared state and Axum extractors for authentication.

use crate::auth::key::DerivedKey;
use crate::auth::rate_limit::{client_key, RateLimiter};
use crate::auth::token::{self, TokenClaims};
use crate::config::Config;
use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use std::sync::Arc;

/// Application state shared across handlers.
///
/// The config and key are read-only after startup; the limiter's table is the
/// only mutable shared state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub key: Arc<DerivedKey>,
    pub limiter: RateLimiter,
}

/// Rate-limit key of the calling client.
///
/// See [`client_key`] for how it is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientKey(client_key(&parts.headers)))
    }
}

/// Verified bearer token extractor.
///
/// Extracts and decrypts the token from `Authorization: Bearer {token}`.
/// Returns 401 Unauthorized if missing, malformed, tampered or expired.
pub struct BearerToken(pub TokenClaims);

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = parse_bearer_token(auth_header)
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?;

        let claims = token::verify(token, &state.key)?;
        Ok(BearerToken(claims))
    }
}

/// Split `Bearer <token>` into its token.
///
/// Exactly two space-separated parts are required, the first being the
/// `Bearer` scheme (case-insensitive) and the second non-empty.
pub fn parse_bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    let (scheme, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}
