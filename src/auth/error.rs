use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use super::types::ErrorBody;

/// Failures of the auth endpoints. `Display` is `CODE: message`, the same text
/// clients see as `{code, message}`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("INVALID_REQUEST_BODY: Missing or malformed request body")]
    InvalidRequestBody,
    #[error("INVALID_EMAIL: Invalid email")]
    InvalidEmail,
    #[error("PASSWORD_TOO_SHORT: Password too short")]
    PasswordTooShort,
    #[error("PASSWORD_TOO_LONG: Password too long")]
    PasswordTooLong,
    #[error("NAME_REQUIRED: Name is required")]
    NameRequired,
    #[error("USER_ALREADY_EXISTS: User already exists")]
    UserAlreadyExists,
    #[error("INVALID_EMAIL_OR_PASSWORD: Invalid email or password")]
    InvalidEmailOrPassword,
    #[error("EMAIL_NOT_VERIFIED: Email not verified")]
    EmailNotVerified,
    #[error("EMAIL_PASSWORD_DISABLED: Email and password sign-in is disabled")]
    EmailPasswordDisabled,
    #[error("NOT_FOUND: Not found")]
    NotFound,
    #[error("INTERNAL_SERVER_ERROR: Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequestBody => "INVALID_REQUEST_BODY",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::PasswordTooShort => "PASSWORD_TOO_SHORT",
            Self::PasswordTooLong => "PASSWORD_TOO_LONG",
            Self::NameRequired => "NAME_REQUIRED",
            Self::UserAlreadyExists => "USER_ALREADY_EXISTS",
            Self::InvalidEmailOrPassword => "INVALID_EMAIL_OR_PASSWORD",
            Self::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            Self::EmailPasswordDisabled => "EMAIL_PASSWORD_DISABLED",
            Self::NotFound => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody
            | Self::InvalidEmail
            | Self::PasswordTooShort
            | Self::PasswordTooLong
            | Self::NameRequired
            | Self::EmailPasswordDisabled => StatusCode::BAD_REQUEST,
            Self::UserAlreadyExists => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidEmailOrPassword => StatusCode::UNAUTHORIZED,
            Self::EmailNotVerified => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message half of the display text.
    #[must_use]
    pub fn message(&self) -> String {
        let text = self.to_string();
        text.split_once(": ")
            .map_or_else(|| text.clone(), |(_, message)| message.to_string())
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.message(),
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("auth request failed: {err:#}");
        }
        (self.status(), Json(self.body())).into_response()
    }
}
