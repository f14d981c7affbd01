//! Background reclamation of expired rate-limit entries.
//!
//! Expired entries already behave like missing ones, so purging only bounds
//! memory. The loop runs until its cancellation token fires, which the
//! server does on shutdown.

use crate::auth::rate_limit::RateLimiter;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Run the cleanup loop.
///
/// Purges expired entries from `limiter` every `interval` until `shutdown`
/// is cancelled.
pub async fn run_cleanup_loop(limiter: RateLimiter, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Rate limit cleanup stopped");
                return;
            }
            _ = ticker.tick() => {
                let removed = limiter.cleanup();
                if removed > 0 {
                    tracing::info!(
                        removed = removed,
                        remaining = limiter.len(),
                        "Rate limit cleanup completed"
                    );
                }
            }
        }
    }
}

/// Spawn [`run_cleanup_loop`] on the current runtime.
pub fn spawn_cleanup(
    limiter: RateLimiter,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_cleanup_loop(limiter, interval, shutdown))
}
