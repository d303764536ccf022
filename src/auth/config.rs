//! Auth configuration: base URL, signing secret, email/password policy and
//! session lifetime.

use secrecy::{ExposeSecret, SecretString};
use std::{fmt, str::FromStr};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:13200";

/// Fallback secret for local development only. Production refuses it.
pub const DEVELOPMENT_SECRET: &str = "default-secret-key";

pub const MIN_PRODUCTION_SECRET_LENGTH: usize = 32;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;
const DEFAULT_MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("BETTER_AUTH_SECRET is required in production")]
    Missing,
    #[error("BETTER_AUTH_SECRET must not be the development default in production")]
    DevelopmentDefault,
    #[error("BETTER_AUTH_SECRET must be at least {MIN_PRODUCTION_SECRET_LENGTH} characters in production")]
    TooShort,
}

/// Pick the signing secret for `environment`.
///
/// Development falls back to [`DEVELOPMENT_SECRET`]; production fails instead.
///
/// # Errors
/// Returns a [`SecretError`] when production is missing a usable secret.
pub fn resolve_secret(
    secret: Option<String>,
    environment: Environment,
) -> Result<SecretString, SecretError> {
    let secret = secret.filter(|value| !value.trim().is_empty());
    match (environment, secret) {
        (Environment::Production, None) => Err(SecretError::Missing),
        (Environment::Production, Some(value)) if value == DEVELOPMENT_SECRET => {
            Err(SecretError::DevelopmentDefault)
        }
        (Environment::Production, Some(value)) if value.len() < MIN_PRODUCTION_SECRET_LENGTH => {
            Err(SecretError::TooShort)
        }
        (_, Some(value)) => Ok(SecretString::from(value)),
        (Environment::Development, None) => {
            tracing::warn!("BETTER_AUTH_SECRET not set, using the development default secret");
            Ok(SecretString::from(DEVELOPMENT_SECRET))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailPasswordPolicy {
    pub enabled: bool,
    pub require_email_verification: bool,
    pub min_password_length: usize,
    pub max_password_length: usize,
}

impl Default for EmailPasswordPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            require_email_verification: false,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            max_password_length: DEFAULT_MAX_PASSWORD_LENGTH,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    secret: SecretString,
    email_and_password: EmailPasswordPolicy,
    session_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String, secret: SecretString) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
            email_and_password: EmailPasswordPolicy::default(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_email_and_password(mut self, policy: EmailPasswordPolicy) -> Self {
        self.email_and_password = policy;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn email_and_password(&self) -> &EmailPasswordPolicy {
        &self.email_and_password
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// True when the secret is the development fallback.
    #[must_use]
    pub fn uses_development_secret(&self) -> bool {
        self.secret.expose_secret() == DEVELOPMENT_SECRET
    }
}
