//! # Server auth module
//!
//! [`AuthService`] owns the Postgres pool and the [`AuthConfig`]. It exposes
//! the `/api/auth` request handler ([`AuthService::handler`]) and the same
//! operations in-process, which the server-rendered pages call directly.
//!
//! ## Email/password flow
//! - Sign-up validates the input, hashes the password (Argon2id) and inserts the
//!   user and its `credential` account in one transaction. A session is issued
//!   unless email verification is required.
//! - Sign-in looks up the credential by normalized email and verifies the hash.
//!   Unknown emails and wrong passwords share one error.
//! - Sessions are stored as SHA-256 digests; the client holds `token.signature`.

mod config;
mod cookie;
mod error;
pub(crate) mod handlers;
mod openapi;
mod password;
mod storage;
mod token;
pub mod types;

pub use config::{
    resolve_secret, AuthConfig, EmailPasswordPolicy, Environment, SecretError, DEFAULT_BASE_URL,
    DEVELOPMENT_SECRET, MIN_PRODUCTION_SECRET_LENGTH,
};
pub use cookie::{client_meta, SESSION_COOKIE_NAME};
pub use error::AuthError;
pub use openapi::openapi;
pub use storage::ClientMeta;

use axum::{
    http::{header::InvalidHeaderValue, HeaderMap, HeaderValue},
    routing::{get, post},
    Extension, Router,
};
use regex::Regex;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};

use storage::{CredentialRecord, SignupOutcome};
use types::{SessionInfo, SessionPayload, SignInEmailRequest, SignUpEmailRequest, UserInfo};

/// A freshly issued session. `token` is the signed value handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: SessionInfo,
    pub user: UserInfo,
    /// `false` when the cookie should not outlive the browser session.
    pub persistent: bool,
}

#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: UserInfo,
    /// `None` when email verification is required before signing in.
    pub session: Option<IssuedSession>,
}

pub struct AuthService {
    pool: PgPool,
    config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(pool: PgPool, config: AuthConfig) -> Self {
        Self { pool, config }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Router for everything under the `/api/auth` prefix. Unknown paths
    /// answer `404 {code: "NOT_FOUND"}`.
    pub fn handler(self: Arc<Self>) -> Router {
        Router::new()
            .route("/sign-up/email", post(handlers::sign_up_email))
            .route("/sign-in/email", post(handlers::sign_in_email))
            .route("/sign-out", post(handlers::sign_out))
            .route("/get-session", get(handlers::get_session))
            .route("/ok", get(handlers::ok))
            .route("/openapi.json", get(openapi::openapi_json))
            .fallback(handlers::not_found)
            .layer(Extension(self))
    }

    /// Create a user with an email/password credential.
    ///
    /// # Errors
    /// Validation failures, `USER_ALREADY_EXISTS`, or an internal error.
    pub async fn sign_up_email(
        &self,
        request: SignUpEmailRequest,
        meta: &ClientMeta,
    ) -> Result<SignUpOutcome, AuthError> {
        let policy = self.config.email_and_password();
        if !policy.enabled {
            return Err(AuthError::EmailPasswordDisabled);
        }

        let email = normalize_email(&request.email);
        if !valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        self.check_password_length(&request.password)?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AuthError::NameRequired);
        }

        let password_hash = password::hash_password_blocking(request.password).await?;
        let user = match storage::insert_user_with_credential(
            &self.pool,
            name,
            &email,
            &password_hash,
        )
        .await?
        {
            SignupOutcome::Created(user) => user,
            SignupOutcome::Conflict => {
                debug!("sign-up rejected: email already registered");
                return Err(AuthError::UserAlreadyExists);
            }
        };
        info!(user_id = user.id, "user signed up");

        if policy.require_email_verification {
            return Ok(SignUpOutcome {
                user: user.into(),
                session: None,
            });
        }

        let issued = self.issue_session(user, meta, true).await?;
        Ok(SignUpOutcome {
            user: issued.user.clone(),
            session: Some(issued),
        })
    }

    /// Verify email and password and issue a session.
    ///
    /// # Errors
    /// `INVALID_EMAIL_OR_PASSWORD` for unknown emails and wrong passwords alike,
    /// `EMAIL_NOT_VERIFIED` when verification is required, or an internal error.
    pub async fn sign_in_email(
        &self,
        request: SignInEmailRequest,
        meta: &ClientMeta,
    ) -> Result<IssuedSession, AuthError> {
        if !self.config.email_and_password().enabled {
            return Err(AuthError::EmailPasswordDisabled);
        }

        let email = normalize_email(&request.email);
        if !valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }

        let Some(CredentialRecord {
            user,
            password_hash: Some(password_hash),
        }) = storage::lookup_credential(&self.pool, &email).await?
        else {
            // Hash anyway so unknown emails cost the same as wrong passwords.
            let _ = password::hash_password_blocking(request.password).await;
            return Err(AuthError::InvalidEmailOrPassword);
        };

        if !password::verify_password_blocking(request.password, password_hash).await? {
            return Err(AuthError::InvalidEmailOrPassword);
        }

        if self.config.email_and_password().require_email_verification && !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let persistent = request.remember_me.unwrap_or(true);
        let issued = self.issue_session(user, meta, persistent).await?;
        info!(user_id = %issued.user.id, "user signed in");
        Ok(issued)
    }

    /// Delete the session named by the request, if any.
    ///
    /// # Errors
    /// Returns an internal error if the delete fails.
    pub async fn sign_out(&self, headers: &HeaderMap) -> Result<bool, AuthError> {
        let Some(token) = self.verified_token(headers) else {
            return Ok(false);
        };
        let deleted = storage::delete_session(&self.pool, &token::hash_session_token(&token)).await?;
        Ok(deleted)
    }

    /// Resolve the cookie or bearer token into the active session.
    ///
    /// Missing, tampered and expired tokens all yield `Ok(None)`.
    ///
    /// # Errors
    /// Returns an internal error if the lookup fails.
    pub async fn session_from_headers(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<SessionPayload>, AuthError> {
        let Some(token) = self.verified_token(headers) else {
            return Ok(None);
        };
        let found = storage::lookup_session(&self.pool, &token::hash_session_token(&token)).await?;
        Ok(found.map(|(session, user)| SessionPayload {
            session: session.into(),
            user: user.into(),
        }))
    }

    /// `Set-Cookie` value for an issued session.
    ///
    /// # Errors
    /// Returns an internal error if the cookie is not a valid header value.
    pub fn session_cookie(&self, issued: &IssuedSession) -> Result<HeaderValue, AuthError> {
        cookie::session_cookie(&self.config, &issued.token, issued.persistent)
            .map_err(|err| AuthError::Internal(err.into()))
    }

    /// `Set-Cookie` value that removes the session cookie.
    ///
    /// # Errors
    /// Returns an error if the cookie is not a valid header value.
    pub fn clear_session_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        cookie::clear_session_cookie(&self.config)
    }

    fn verified_token(&self, headers: &HeaderMap) -> Option<String> {
        let signed = cookie::extract_session_token(headers)?;
        let verified = token::verify_signed_token(self.config.secret(), &signed);
        if verified.is_none() {
            debug!("ignoring session token with invalid signature");
        }
        verified
    }

    fn check_password_length(&self, password: &str) -> Result<(), AuthError> {
        let policy = self.config.email_and_password();
        let length = password.chars().count();
        if length < policy.min_password_length {
            return Err(AuthError::PasswordTooShort);
        }
        if length > policy.max_password_length {
            return Err(AuthError::PasswordTooLong);
        }
        Ok(())
    }

    async fn issue_session(
        &self,
        user: crate::db::User,
        meta: &ClientMeta,
        persistent: bool,
    ) -> Result<IssuedSession, AuthError> {
        let (raw, session) = storage::insert_session(
            &self.pool,
            user.id,
            self.config.session_ttl_seconds(),
            meta,
        )
        .await?;
        let signed = token::sign_session_token(self.config.secret(), &raw)?;
        Ok(IssuedSession {
            token: signed,
            session: session.into(),
            user: user.into(),
            persistent,
        })
    }
}

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}
