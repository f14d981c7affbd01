//! Authentication core: key derivation, credential checks, rate limiting and
//! encrypted session tokens.

pub mod credentials;
pub mod expiration;
pub mod key;
pub mod middleware;
pub mod rate_limit;
pub mod token;

pub use credentials::{constant_time_eq, verify_credentials};
pub use expiration::{validate_expiration_time, ExpirationSpec};
pub use key::{derive_key, DerivedKey, KeyError};
pub use middleware::{parse_bearer_token, AppState, BearerToken, ClientKey};
pub use rate_limit::{client_key, RateLimiter};
pub use token::{TokenClaims, TokenError};
