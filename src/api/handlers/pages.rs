//! Server-rendered pages. Each submit runs the page component against the
//! in-process auth service; a successful navigation becomes a `303` carrying
//! the session cookie, a rejection re-renders the form with its message.

use axum::{
    extract::{Extension, Form},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error};

use crate::auth::{
    client_meta,
    types::{SignInEmailRequest, SignUpEmailRequest, UserInfo},
    AuthError, AuthService, ClientMeta, IssuedSession,
};
use crate::client::{AuthApi, SessionState};
use crate::pages::{
    HomePage, PageError, Redirect, SignInForm, SignInPage, SignUpForm, SignUpPage, HOME_PATH,
};

/// [`AuthApi`] over the local [`AuthService`]. Keeps the issued session so
/// the route can set the cookie after the page has navigated.
struct LocalAuth<'a> {
    auth: &'a AuthService,
    meta: ClientMeta,
    issued: OnceLock<IssuedSession>,
}

impl<'a> LocalAuth<'a> {
    fn new(auth: &'a AuthService, meta: ClientMeta) -> Self {
        Self {
            auth,
            meta,
            issued: OnceLock::new(),
        }
    }

    fn issued(&self) -> Option<&IssuedSession> {
        self.issued.get()
    }

    fn keep(&self, issued: IssuedSession) -> UserInfo {
        let user = issued.user.clone();
        let _ = self.issued.set(issued);
        user
    }
}

fn log_rejection(err: &AuthError) {
    if let AuthError::Internal(source) = err {
        error!("Auth request failed: {source:#}");
    } else {
        debug!("Auth request rejected: {err}");
    }
}

impl AuthApi for LocalAuth<'_> {
    type Error = AuthError;

    async fn sign_in_email(&self, request: SignInEmailRequest) -> Result<UserInfo, AuthError> {
        match self.auth.sign_in_email(request, &self.meta).await {
            Ok(issued) => Ok(self.keep(issued)),
            Err(err) => {
                log_rejection(&err);
                Err(err)
            }
        }
    }

    async fn sign_up_email(&self, request: SignUpEmailRequest) -> Result<UserInfo, AuthError> {
        match self.auth.sign_up_email(request, &self.meta).await {
            Ok(outcome) => Ok(match outcome.session {
                Some(issued) => self.keep(issued),
                None => outcome.user,
            }),
            Err(err) => {
                log_rejection(&err);
                Err(err)
            }
        }
    }
}

fn html(status: StatusCode, page: Result<String, PageError>) -> Response {
    match page {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            error!("Failed to render page: {err}");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html("<h1>Internal Server Error</h1>"),
    )
        .into_response()
}

fn see_other(target: &str, cookie: Option<HeaderValue>) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();
    match HeaderValue::from_str(target) {
        Ok(location) => {
            response.headers_mut().insert(LOCATION, location);
        }
        Err(err) => {
            error!("Invalid redirect target {target}: {err}");
            return internal_error();
        }
    }
    if let Some(cookie) = cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Turn a finished submission into a redirect (with the cookie when a session
/// was issued) or `None` when the page stayed put.
fn navigate(auth: &AuthService, redirect: &Redirect, local: &LocalAuth<'_>) -> Option<Response> {
    let target = redirect.target()?;
    let cookie = match local.issued().map(|issued| auth.session_cookie(issued)) {
        Some(Ok(cookie)) => Some(cookie),
        Some(Err(err)) => {
            log_rejection(&err);
            return Some(internal_error());
        }
        None => None,
    };
    Some(see_other(target, cookie))
}

// axum handler for GET /
pub async fn home(headers: HeaderMap, auth: Extension<Arc<AuthService>>) -> Response {
    let state = match auth.session_from_headers(&headers).await {
        Ok(data) => SessionState::resolved(data),
        Err(err) => {
            log_rejection(&err);
            SessionState::resolved(None)
        }
    };
    html(StatusCode::OK, HomePage::new(state).render())
}

pub async fn sign_in_page() -> Response {
    html(StatusCode::OK, SignInPage::new().render())
}

pub async fn sign_in_submit(
    headers: HeaderMap,
    auth: Extension<Arc<AuthService>>,
    Form(form): Form<SignInForm>,
) -> Response {
    let local = LocalAuth::new(&auth, client_meta(&headers));
    let redirect = Redirect::new();
    let mut page = SignInPage::from_form(form);

    page.submit(&local, &redirect).await;

    navigate(&auth, &redirect, &local).unwrap_or_else(|| html(StatusCode::OK, page.render()))
}

pub async fn sign_up_page() -> Response {
    html(StatusCode::OK, SignUpPage::new().render())
}

pub async fn sign_up_submit(
    headers: HeaderMap,
    auth: Extension<Arc<AuthService>>,
    Form(form): Form<SignUpForm>,
) -> Response {
    let local = LocalAuth::new(&auth, client_meta(&headers));
    let redirect = Redirect::new();
    let mut page = SignUpPage::from_form(form);

    page.submit(&local, &redirect).await;

    navigate(&auth, &redirect, &local).unwrap_or_else(|| html(StatusCode::OK, page.render()))
}

/// Drop the session (best effort) and go home with the cookie cleared.
pub async fn sign_out(headers: HeaderMap, auth: Extension<Arc<AuthService>>) -> Response {
    if let Err(err) = auth.sign_out(&headers).await {
        log_rejection(&err);
    }
    match auth.clear_session_cookie() {
        Ok(cookie) => see_other(HOME_PATH, Some(cookie)),
        Err(err) => {
            error!("Failed to build cookie: {err}");
            internal_error()
        }
    }
}
