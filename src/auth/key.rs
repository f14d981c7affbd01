//! Token key derivation.
//!
//! The operator secret is stretched with PBKDF2-HMAC-SHA256 into the 32-byte
//! key used for `A128CBC-HS256` token encryption. The derivation is
//! deterministic so tokens survive a process restart.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum accepted length of the operator secret, in characters.
pub const MIN_SECRET_LEN: usize = 32;

/// PBKDF2 iteration count (OWASP minimum for SHA-256 at the time of writing).
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of the derived key in bytes.
pub const KEY_LEN: usize = 32;

const SALT_PREFIX: &str = "picnic-auth-";
const FALLBACK_SALT: &str = "picnic-auth-salt-v1";
const SALT_CONTEXT_CHARS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("secret must be at least {min} characters, got {0}", min = MIN_SECRET_LEN)]
    SecretTooShort(usize),
}

/// A 32-byte symmetric key, zeroized on drop.
///
/// Deliberately has no `Display` and a redacting `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// MAC half of the key (first 16 bytes), per RFC 7518 §5.2.2.1.
    pub fn mac_key(&self) -> &[u8] {
        &self.0[..KEY_LEN / 2]
    }

    /// Encryption half of the key (last 16 bytes).
    pub fn enc_key(&self) -> &[u8] {
        &self.0[KEY_LEN / 2..]
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the token key from `secret`.
///
/// When `context` is given, the salt is `picnic-auth-` followed by its first
/// 16 characters, binding the key to the deployment's configuration.
/// Otherwise a fixed fallback salt is used.
pub fn derive_key(secret: &str, context: Option<&str>) -> Result<DerivedKey, KeyError> {
    let secret_len = secret.chars().count();
    if secret_len < MIN_SECRET_LEN {
        return Err(KeyError::SecretTooShort(secret_len));
    }

    let salt = salt_for(context);
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS, &mut key);

    let derived = DerivedKey(key);
    key.zeroize();
    Ok(derived)
}

fn salt_for(context: Option<&str>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => {
            let prefix: String = ctx.chars().take(SALT_CONTEXT_CHARS).collect();
            format!("{}{}", SALT_PREFIX, prefix)
        }
        _ => FALLBACK_SALT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "secretsecretsecretsecretsecretsecretsecretsecret";

    #[test]
    fn test_derive_key_is_deterministic() {
        let a = derive_key(SECRET, None).unwrap();
        let b = derive_key(SECRET, None).unwrap();
        assert_eq!(a.as_bytes().len(), KEY_LEN);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_secrets_give_different_keys() {
        let a = derive_key(SECRET, None).unwrap();
        let b = derive_key("differentsecretdifferentsecretdifferent", None).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_context_salt_changes_key() {
        let context = "myjwtsecretkeymyjwtsecretkeymyjwtsecretkey";
        let bound = derive_key(SECRET, Some(context)).unwrap();
        let fixed = derive_key(SECRET, None).unwrap();
        assert_ne!(bound.as_bytes(), fixed.as_bytes());

        // Still deterministic with a context
        assert_eq!(bound, derive_key(SECRET, Some(context)).unwrap());
    }

    #[test]
    fn test_context_only_uses_first_16_chars() {
        let a = derive_key(SECRET, Some("0123456789abcdefXXXX")).unwrap();
        let b = derive_key(SECRET, Some("0123456789abcdefYYYY")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_context_uses_fallback_salt() {
        let a = derive_key(SECRET, Some("")).unwrap();
        let b = derive_key(SECRET, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = derive_key("tooshort", None);
        assert_eq!(result.unwrap_err(), KeyError::SecretTooShort(8));

        // Exactly 32 characters is accepted
        assert!(derive_key(&"a".repeat(32), None).is_ok());
        assert!(derive_key(&"a".repeat(31), None).is_err());
    }

    #[test]
    fn test_key_halves() {
        let key = derive_key(SECRET, None).unwrap();
        assert_eq!(key.mac_key(), &key.as_bytes()[..16]);
        assert_eq!(key.enc_key(), &key.as_bytes()[16..]);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = derive_key(SECRET, None).unwrap();
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
