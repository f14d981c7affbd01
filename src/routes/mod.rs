//! API route handlers.

pub mod auth;

use crate::auth::middleware::AppState;
use crate::error::AppError;
use crate::middleware::{response_headers, security_headers};
use axum::{
    http::{header, HeaderValue, Method},
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Every unknown route or method gets the same answer as a failed login.
async fn unauthorized() -> AppError {
    AppError::Unauthorized("No such route".to_string())
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/auth", post(auth::authenticate).fallback(unauthorized))
        .route(
            "/auth/bearer",
            post(auth::bearer_auth).fallback(unauthorized),
        )
        .fallback(unauthorized)
}

/// Build the full application: API routes, CORS preflight handling and the
/// security headers, bound to `state`.
pub fn app(state: AppState) -> Router {
    let origin = state.config.cors_origin.clone();

    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(&origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => AllowOrigin::list(Vec::<HeaderValue>::new()),
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    api_router()
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            Arc::new(response_headers(&origin)),
            security_headers,
        ))
        .with_state(state)
}
