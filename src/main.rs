//! picnic-auth application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Derive the token key from the operator secret
//! 3. Start the rate-limit cleanup task
//! 4. Build router with API routes, CORS and security headers
//! 5. Serve until Ctrl-C / SIGTERM, then stop the cleanup task
//!
//! Also supports a `hash-password` subcommand for producing the bcrypt hash
//! expected in `PICNIC_PASSWORD_BCRYPT`.

use picnic_auth::{
    auth::{derive_key, AppState, RateLimiter},
    cleanup,
    config::{Config, ConfigError},
    routes,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn print_hash_password_usage() {
    eprintln!("Usage: picnic-auth hash-password <password>");
    eprintln!();
    eprintln!("Print a bcrypt hash of <password> for PICNIC_PASSWORD_BCRYPT.");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  picnic-auth hash-password mypicnic");
    eprintln!();
    eprintln!("Then set in .env:");
    eprintln!("  PICNIC_PASSWORD_BCRYPT='<output>'");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    // Check for hash-password subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "hash-password" {
        if args.len() != 3 {
            print_hash_password_usage();
            std::process::exit(1);
        }

        match bcrypt::hash(&args[2], bcrypt::DEFAULT_COST) {
            Ok(hash) => println!("{}", hash),
            Err(e) => {
                eprintln!("Error hashing password: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            if let ConfigError::MissingVar(var) | ConfigError::InvalidValue(var, _) = &e {
                if var == "PICNIC_JWT_SECRET" {
                    eprintln!("Set PICNIC_JWT_SECRET to at least 32 random characters, e.g.:");
                    eprintln!("  export PICNIC_JWT_SECRET=\"$(openssl rand -hex 64)\"");
                }
            }
            std::process::exit(1);
        }
    };
    tracing::info!(
        username = %config.account.username,
        expiration = %config.expiration,
        "Starting picnic-auth on {}",
        config.bind_addr
    );

    // Salt context: first 16 characters of the secret
    let secret = config.jwt_secret.as_str();
    let key = match derive_key(secret, Some(secret)) {
        Ok(key) => key,
        Err(e) => {
            tracing::error!(error = %e, "Failed to derive token key");
            std::process::exit(1);
        }
    };

    let limiter = RateLimiter::new(config.rate_limit_max_attempts, config.rate_limit_window);
    let shutdown = CancellationToken::new();
    let cleanup_task = cleanup::spawn_cleanup(
        limiter.clone(),
        config.rate_limit_cleanup_interval,
        shutdown.clone(),
    );

    let bind_addr = config.bind_addr;
    let state = AppState {
        config: Arc::new(config),
        key: Arc::new(key),
        limiter,
    };
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown.cancel();
    if let Err(e) = cleanup_task.await {
        tracing::error!(error = %e, "Cleanup task failed");
    }

    served.expect("Server error");
}
