//! Integration tests for the picnic-auth HTTP API.
//!
//! Each test spins up a real server on an ephemeral port and talks to it over
//! HTTP with reqwest.

use picnic_auth::{
    auth::{derive_key, validate_expiration_time, AppState, RateLimiter, TokenClaims},
    cleanup,
    config::{Account, Config},
    routes,
};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SECRET: &str = "integration-secret-integration-secret-0123456789";
const ORIGIN: &str = "https://picnic.example.com";

fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| bcrypt::hash("mypicnic", 4).expect("bcrypt hash"))
}

fn test_config(expiration: &str) -> Config {
    Config {
        account: Account {
            username: "picnic".to_string(),
            password_hash: password_hash().to_string(),
        },
        jwt_secret: zeroize::Zeroizing::new(SECRET.to_string()),
        expiration: validate_expiration_time(expiration).expect("valid expiration"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        cors_origin: ORIGIN.to_string(),
        body_timeout: Duration::from_secs(5),
        rate_limit_max_attempts: 5,
        rate_limit_window: Duration::from_secs(900),
        rate_limit_cleanup_interval: Duration::from_secs(300),
    }
}

/// Spin up a test server and return its base URL and shutdown token.
async fn spawn_test_server(config: Config) -> (String, CancellationToken) {
    let secret = config.jwt_secret.as_str();
    let key = derive_key(secret, Some(secret)).unwrap();
    let limiter = RateLimiter::new(config.rate_limit_max_attempts, config.rate_limit_window);
    let shutdown = CancellationToken::new();

    cleanup::spawn_cleanup(
        limiter.clone(),
        config.rate_limit_cleanup_interval,
        shutdown.clone(),
    );

    let state = AppState {
        config: Arc::new(config),
        key: Arc::new(key),
        limiter,
    };
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
            .unwrap();
    });

    (format!("http://{}", addr), shutdown)
}

async fn login(
    client: &reqwest::Client,
    base_url: &str,
    client_ip: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/auth", base_url))
        .header("x-forwarded-for", client_ip)
        .json(&serde_json::json!({ "username": "picnic", "password": password }))
        .send()
        .await
        .expect("Failed to send request")
}

// ============================================================================
// /auth
// ============================================================================

#[tokio::test]
async fn test_login_returns_encrypted_token() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let resp = login(&client, &base_url, "198.51.100.1", "mypicnic").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-ratelimit-limit"], "5");
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "4");
    assert_eq!(resp.headers()["access-control-allow-origin"], ORIGIN);
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers()["x-frame-options"], "DENY");

    let token: String = resp.json().await.unwrap();
    assert!(token.starts_with("eyJ"));

    shutdown.cancel();
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let resp = login(&client, &base_url, "198.51.100.2", "not-my-picnic").await;
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.text().await.unwrap(), "Unauthorized");

    shutdown.cancel();
}

#[tokio::test]
async fn test_sixth_rapid_attempt_is_rate_limited() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    for attempt in 1..=5 {
        let resp = login(&client, &base_url, "198.51.100.3", "wrong").await;
        assert_eq!(resp.status(), 401, "attempt {}", attempt);
        assert_eq!(
            resp.headers()["x-ratelimit-remaining"],
            (5 - attempt).to_string().as_str()
        );
    }

    let resp = login(&client, &base_url, "198.51.100.3", "wrong").await;
    assert_eq!(resp.status(), 429);
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "0");

    // Correct credentials do not bypass the limit
    let resp = login(&client, &base_url, "198.51.100.3", "mypicnic").await;
    assert_eq!(resp.status(), 429);

    // Another client is unaffected
    let resp = login(&client, &base_url, "198.51.100.4", "mypicnic").await;
    assert_eq!(resp.status(), 200);

    shutdown.cancel();
}

#[tokio::test]
async fn test_invalid_bodies_are_bad_requests() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth", base_url))
        .header("content-type", "application/json")
        .body("{\"username\": \"picnic\"")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/auth", base_url))
        .header("content-type", "text/plain")
        .body("{\"username\":\"picnic\",\"password\":\"mypicnic\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    shutdown.cancel();
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth", base_url))
        .header("content-type", "application/json")
        .body(format!(
            "{{\"username\":\"picnic\",\"password\":\"{}\"}}",
            "x".repeat(2048)
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);

    shutdown.cancel();
}

// ============================================================================
// /auth/bearer
// ============================================================================

#[tokio::test]
async fn test_bearer_returns_claims() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let token: String = login(&client, &base_url, "198.51.100.5", "mypicnic")
        .await
        .json()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/auth/bearer", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], ORIGIN);

    let claims: TokenClaims = resp.json().await.unwrap();
    assert_eq!(claims.username, "picnic");
    assert_eq!(claims.exp - claims.iat, 3600);

    shutdown.cancel();
}

#[tokio::test]
async fn test_bearer_rejects_tampered_token() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let token: String = login(&client, &base_url, "198.51.100.6", "mypicnic")
        .await
        .json()
        .await
        .unwrap();

    // Swap the first character of the ciphertext segment
    let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
    let first = segments[3].remove(0);
    segments[3].insert(0, if first == 'A' { 'B' } else { 'A' });
    let tampered = segments.join(".");

    let resp = client
        .post(format!("{}/auth/bearer", base_url))
        .bearer_auth(&tampered)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.text().await.unwrap(), "Unauthorized");

    shutdown.cancel();
}

#[tokio::test]
async fn test_bearer_rejects_expired_token() {
    let (base_url, shutdown) = spawn_test_server(test_config("1s")).await;
    let client = reqwest::Client::new();

    let token: String = login(&client, &base_url, "198.51.100.7", "mypicnic")
        .await
        .json()
        .await
        .unwrap();

    // exp has whole-second resolution; wait past it
    tokio::time::sleep(Duration::from_millis(2100)).await;

    let resp = client
        .post(format!("{}/auth/bearer", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    shutdown.cancel();
}

#[tokio::test]
async fn test_bearer_without_header() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth/bearer", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.text().await.unwrap(), "Unauthorized");

    shutdown.cancel();
}

// ============================================================================
// Everything else
// ============================================================================

#[tokio::test]
async fn test_unknown_routes_are_unauthorized() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/", base_url)).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.headers()["x-frame-options"], "DENY");

    let resp = client
        .get(format!("{}/auth", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    shutdown.cancel();
}

#[tokio::test]
async fn test_cors_preflight() {
    let (base_url, shutdown) = spawn_test_server(test_config("1h")).await;
    let client = reqwest::Client::new();

    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{}/auth", base_url))
        .header("origin", ORIGIN)
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.headers()["access-control-allow-origin"], ORIGIN);

    shutdown.cancel();
}
