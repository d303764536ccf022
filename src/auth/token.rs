//! Session tokens.
//!
//! The raw token is only handed to the browser (signed) and the database keeps
//! its SHA-256 digest, so a leaked `sessions` table cannot be replayed.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Create a new random session token (32 bytes, base64url).
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Digest stored in `sessions."tokenHash"`.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn mac_for(secret: &SecretString, token: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .context("invalid session signing key")?;
    mac.update(token.as_bytes());
    Ok(mac)
}

/// `token.signature`, the value carried by the cookie and bearer header.
pub(crate) fn sign_session_token(secret: &SecretString, token: &str) -> Result<String> {
    let signature = mac_for(secret, token)?.finalize().into_bytes();
    Ok(format!(
        "{token}.{}",
        Base64UrlUnpadded::encode_string(&signature)
    ))
}

/// Return the raw token if `signed` carries a valid signature.
pub(crate) fn verify_signed_token(secret: &SecretString, signed: &str) -> Option<String> {
    let (token, signature) = signed.rsplit_once('.')?;
    if token.is_empty() {
        return None;
    }
    let signature = Base64UrlUnpadded::decode_vec(signature).ok()?;
    mac_for(secret, token)
        .ok()?
        .verify_slice(&signature)
        .ok()
        .map(|()| token.to_string())
}
