//! Request and response models for the API.

use serde::Deserialize;

pub use crate::auth::token::TokenClaims;

/// Maximum accepted length of each credential field, in bytes.
pub const MAX_FIELD_LEN: usize = 256;

/// Body of `POST /auth`.
#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Check field constraints, returning a client-facing message on failure.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("username", &self.username), ("password", &self.password)] {
            if value.is_empty() {
                return Err(format!("{} must not be empty", name));
            }
            if value.len() > MAX_FIELD_LEN {
                return Err(format!("{} must be at most {} bytes", name, MAX_FIELD_LEN));
            }
        }
        Ok(())
    }
}
