//! CORS and security response headers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Build the fixed header set attached to every response.
///
/// - **Access-Control-Allow-Origin**: the configured origin.
/// - **X-Content-Type-Options: nosniff**: no MIME sniffing.
/// - **X-Frame-Options: DENY**: no framing.
/// - **X-XSS-Protection**: legacy browser XSS filter.
/// - **Strict-Transport-Security**: HTTPS only for one year, subdomains included.
/// - **Referrer-Policy: strict-origin-when-cross-origin**
/// - **Content-Security-Policy**: nothing may load; responses are data only.
///
/// An origin that is not a valid header value is left out.
pub fn response_headers(origin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    match HeaderValue::from_str(origin) {
        Ok(value) => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        Err(_) => tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"),
    }

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; script-src 'none'; object-src 'none'"),
    );

    headers
}

/// Middleware that stamps the precomputed [`response_headers`] onto every
/// response, replacing any value set further in.
///
/// # Usage
///
/// ```rust,no_run
/// use axum::Router;
/// use axum::middleware;
/// use picnic_auth::middleware::{response_headers, security_headers};
/// use std::sync::Arc;
///
/// let app: Router = Router::new().layer(middleware::from_fn_with_state(
///     Arc::new(response_headers("https://app.example.com")),
///     security_headers,
/// ));
/// ```
pub async fn security_headers(
    State(fixed): State<Arc<HeaderMap>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in fixed.iter() {
        headers.insert(name.clone(), value.clone());
    }

    response
}
