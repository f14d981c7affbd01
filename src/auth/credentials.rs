//! Username/password verification against the configured account.

use crate::config::Account;
use subtle::ConstantTimeEq;

/// Compare two strings without leaking the position of the first difference.
///
/// Differing lengths return early; length is not treated as secret.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Verify submitted credentials against `account`.
///
/// The bcrypt comparison runs exactly once on every call, whether or not the
/// username matched, so response latency does not reveal valid usernames.
/// This is CPU-bound; async callers should run it on a blocking thread.
pub fn verify_credentials(username: &str, password: &str, account: &Account) -> bool {
    let username_ok = constant_time_eq(username, &account.username);

    let password_ok = match bcrypt::verify(password, &account.password_hash) {
        Ok(ok) => ok,
        Err(e) => {
            tracing::error!(error = %e, "Password hash comparison failed");
            false
        }
    };

    username_ok & password_ok
}
