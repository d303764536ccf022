//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings in `accounts.password`. Both operations are
//! CPU-bound, so callers run them on the blocking pool.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password with a fresh salt.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is malformed.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|err| anyhow!("invalid password hash: {err}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub(crate) async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

pub(crate) async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let hash = hash_password("password123")?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("password123", &hash)?);
        assert!(!verify_password("password124", &hash)?);
        Ok(())
    }

    #[test]
    fn same_password_gets_distinct_salts() -> Result<()> {
        assert_ne!(hash_password("password123")?, hash_password("password123")?);
        Ok(())
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("password123", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn blocking_wrappers_round_trip() -> Result<()> {
        let hash = hash_password_blocking("password123".to_string()).await?;
        assert!(verify_password_blocking("password123".to_string(), hash).await?);
        Ok(())
    }
}
