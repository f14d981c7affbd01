//! Encrypted session tokens.
//!
//! Tokens are JWE compact serialisations using direct key agreement and
//! `A128CBC-HS256` content encryption (RFC 7516 / RFC 7518 §5.2.3):
//!
//! ```text
//! BASE64URL(header) . "" . BASE64URL(iv) . BASE64URL(ciphertext) . BASE64URL(tag)
//! ```
//!
//! The tokens are stateless. A token is valid iff it authenticates under the
//! derived key and its `exp` claim is still in the future.

use crate::auth::expiration::ExpirationSpec;
use crate::auth::key::DerivedKey;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use std::time::{SystemTime, UNIX_EPOCH};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

const ALG_DIR: &str = "dir";
const ENC_A128CBC_HS256: &str = "A128CBC-HS256";
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Claims carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub username: String,
    /// Issued-at, Unix seconds
    pub iat: u64,
    /// Expiration, Unix seconds
    pub exp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct JweHeader {
    alg: String,
    enc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Malformed, tampered, or encrypted under a different key
    #[error("Invalid token: {0}")]
    Invalid(&'static str),

    /// Authentic, but at or past its expiration
    #[error("Token expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Issue a token for `username` that expires after `expiration`.
pub fn issue(
    username: &str,
    key: &DerivedKey,
    expiration: &ExpirationSpec,
) -> Result<String, TokenError> {
    issue_at(username, key, expiration, unix_now())
}

/// Issue a token as if the current time were `now` (Unix seconds).
pub fn issue_at(
    username: &str,
    key: &DerivedKey,
    expiration: &ExpirationSpec,
    now: u64,
) -> Result<String, TokenError> {
    let claims = TokenClaims {
        username: username.to_string(),
        iat: now,
        exp: now.saturating_add(expiration.duration().as_secs()),
    };
    let plaintext =
        serde_json::to_vec(&claims).map_err(|e| TokenError::Encoding(e.to_string()))?;

    let header = JweHeader {
        alg: ALG_DIR.to_string(),
        enc: ENC_A128CBC_HS256.to_string(),
    };
    let header_json =
        serde_json::to_vec(&header).map_err(|e| TokenError::Encoding(e.to_string()))?;
    let protected = URL_SAFE_NO_PAD.encode(header_json);

    let mut iv = [0u8; IV_LEN];
    rand::rng().fill(&mut iv);

    let ciphertext = Aes128CbcEnc::new_from_slices(key.enc_key(), &iv)
        .map_err(|e| TokenError::Encoding(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

    let tag = compute_tag(key, protected.as_bytes(), &iv, &ciphertext)?;

    Ok(format!(
        "{}..{}.{}.{}",
        protected,
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(&ciphertext),
        URL_SAFE_NO_PAD.encode(tag),
    ))
}

/// Decrypt and validate a token against the current time.
pub fn verify(token: &str, key: &DerivedKey) -> Result<TokenClaims, TokenError> {
    verify_at(token, key, unix_now())
}

/// Decrypt and validate a token as if the current time were `now`.
///
/// The tag is checked before anything is decrypted; expiration is checked only
/// once the payload is known to be authentic.
pub fn verify_at(token: &str, key: &DerivedKey, now: u64) -> Result<TokenClaims, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
        return Err(TokenError::Invalid("expected 5 segments"));
    };

    if !encrypted_key.is_empty() {
        return Err(TokenError::Invalid("unexpected encrypted key"));
    }

    let header_json = decode_segment(protected)?;
    let header: JweHeader = serde_json::from_slice(&header_json)
        .map_err(|_| TokenError::Invalid("malformed header"))?;
    if header.alg != ALG_DIR || header.enc != ENC_A128CBC_HS256 {
        return Err(TokenError::Invalid("unsupported algorithm"));
    }

    let iv = decode_segment(iv)?;
    if iv.len() != IV_LEN {
        return Err(TokenError::Invalid("bad iv length"));
    }
    let ciphertext = decode_segment(ciphertext)?;
    let tag = decode_segment(tag)?;

    let expected = compute_tag(key, protected.as_bytes(), &iv, &ciphertext)?;
    if tag.len() != TAG_LEN || !bool::from(expected.as_slice().ct_eq(&tag)) {
        return Err(TokenError::Invalid("authentication tag mismatch"));
    }

    let plaintext = Aes128CbcDec::new_from_slices(key.enc_key(), &iv)
        .map_err(|_| TokenError::Invalid("bad iv length"))?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| TokenError::Invalid("bad padding"))?;

    let claims: TokenClaims = serde_json::from_slice(&plaintext)
        .map_err(|_| TokenError::Invalid("malformed claims"))?;

    if now >= claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

/// Leftmost 16 bytes of HMAC-SHA256(mac_key, aad || iv || ciphertext || al).
fn compute_tag(
    key: &DerivedKey,
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<[u8; TAG_LEN], TokenError> {
    let al = ((aad.len() as u64) * 8).to_be_bytes();

    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.mac_key())
        .map_err(|e| TokenError::Encoding(e.to_string()))?;
    mac.update(aad);
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(&al);
    let full = mac.finalize().into_bytes();

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&full[..TAG_LEN]);
    Ok(tag)
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Invalid("bad base64"))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
