//! # Client auth module
//!
//! [`AuthClient`] talks to `/api/auth/*` over HTTP, keeps the session cookie in
//! its own cookie store and publishes the current session through a
//! [`SessionStore`]. Pages depend on the narrower [`AuthApi`] trait.

mod error;
mod session;

pub use error::ClientError;
pub use session::{SessionState, SessionStore};

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::{fmt, future::Future};
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use crate::{
    auth::{
        types::{
            ErrorBody, SessionPayload, SignInEmailRequest, SignInResponse, SignUpEmailRequest,
            SignUpResponse, UserInfo,
        },
        DEFAULT_BASE_URL,
    },
    APP_USER_AGENT,
};

/// The auth calls a page needs. Implemented over HTTP by [`AuthClient`] and
/// in-process by the server's page routes.
pub trait AuthApi: Send + Sync {
    type Error: fmt::Display + Send;

    fn sign_in_email(
        &self,
        request: SignInEmailRequest,
    ) -> impl Future<Output = Result<UserInfo, Self::Error>> + Send;

    fn sign_up_email(
        &self,
        request: SignUpEmailRequest,
    ) -> impl Future<Output = Result<UserInfo, Self::Error>> + Send;
}

/// Base URL precedence: `NEXT_PUBLIC_BETTER_AUTH_URL`, `BETTER_AUTH_URL`, default.
#[must_use]
pub fn resolve_base_url(public_url: Option<String>, server_url: Option<String>) -> String {
    [public_url, server_url]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

#[derive(Debug)]
pub struct AuthClient {
    http: reqwest::Client,
    api_base: String,
    session: SessionStore,
}

impl AuthClient {
    /// Build a client for the server at `base_url` (without the `/api/auth` prefix).
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            api_base: format!("{}/api/auth", parsed.as_str().trim_end_matches('/')),
            session: SessionStore::new(),
        })
    }

    /// Client configured from `NEXT_PUBLIC_BETTER_AUTH_URL` / `BETTER_AUTH_URL`.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is invalid.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = resolve_base_url(
            std::env::var("NEXT_PUBLIC_BETTER_AUTH_URL").ok(),
            std::env::var("BETTER_AUTH_URL").ok(),
        );
        Self::new(&base_url)
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Sign in and refresh the session store.
    ///
    /// # Errors
    /// Returns [`ClientError::Http`] carrying the server's code on rejection.
    pub async fn sign_in_email(&self, request: SignInEmailRequest) -> Result<UserInfo, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/sign-in/email"))
            .json(&request)
            .send()
            .await?;
        let body: SignInResponse = decode(response).await?;
        self.refresh_after_auth().await;
        Ok(body.user)
    }

    /// Sign up and refresh the session store.
    ///
    /// # Errors
    /// Returns [`ClientError::Http`] on validation failures or duplicate emails.
    pub async fn sign_up_email(&self, request: SignUpEmailRequest) -> Result<UserInfo, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/sign-up/email"))
            .json(&request)
            .send()
            .await?;
        let body: SignUpResponse = decode(response).await?;
        self.refresh_after_auth().await;
        Ok(body.user)
    }

    /// Sign out. Local session state is cleared even when the request fails.
    ///
    /// # Errors
    /// Returns the transport or server error after clearing local state.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let result = self.http.post(self.endpoint("/sign-out")).send().await;
        self.session.clear();
        let response = result?;
        check_status(response).await.map(|_| ())
    }

    /// Subscribe to session changes. The state stays pending until the first
    /// [`refresh_session`](Self::refresh_session) or sign-in/sign-up resolves.
    #[must_use]
    pub fn use_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Fetch `/get-session` and publish the result.
    ///
    /// # Errors
    /// Returns an error if the request fails; the store keeps its previous state.
    pub async fn refresh_session(&self) -> Result<Option<SessionPayload>, ClientError> {
        let response = self.http.get(self.endpoint("/get-session")).send().await?;
        let session: Option<SessionPayload> = decode(response).await?;
        self.session.publish(session.clone());
        Ok(session)
    }

    async fn refresh_after_auth(&self) {
        if let Err(err) = self.refresh_session().await {
            warn!("Failed to refresh session after sign-in: {err}");
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}

impl AuthApi for AuthClient {
    type Error = ClientError;

    async fn sign_in_email(&self, request: SignInEmailRequest) -> Result<UserInfo, ClientError> {
        Self::sign_in_email(self, request).await
    }

    async fn sign_up_email(&self, request: SignUpEmailRequest) -> Result<UserInfo, ClientError> {
        Self::sign_up_email(self, request).await
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let bytes = response.bytes().await?;
    let body = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| ErrorBody {
        code: fallback_code(status),
        message: status.canonical_reason().unwrap_or("Unknown error").to_string(),
    });
    debug!(status = status.as_u16(), code = %body.code, "auth request rejected");
    Err(ClientError::Http {
        status: status.as_u16(),
        code: body.code,
        message: body.message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = check_status(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn fallback_code(status: StatusCode) -> String {
    format!("HTTP_{}", status.as_u16())
}
