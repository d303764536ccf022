//! HTTP handlers for `/api/auth/*`. Each one is a thin shell over the
//! in-process operations on [`AuthService`].

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info_span, Instrument};

use super::{
    cookie::client_meta,
    error::AuthError,
    types::{
        ErrorBody, OkResponse, SessionPayload, SignInEmailRequest, SignInResponse,
        SignOutResponse, SignUpEmailRequest, SignUpResponse,
    },
    AuthService, IssuedSession,
};

fn cookie_headers(auth: &AuthService, issued: &IssuedSession) -> Result<HeaderMap, AuthError> {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, auth.session_cookie(issued)?);
    Ok(headers)
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up/email",
    request_body = SignUpEmailRequest,
    responses(
        (status = 200, description = "User created", body = SignUpResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 422, description = "Email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn sign_up_email(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthService>>,
    payload: Option<Json<SignUpEmailRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::InvalidRequestBody.into_response();
    };

    let meta = client_meta(&headers);
    let outcome = match auth
        .sign_up_email(request, &meta)
        .instrument(info_span!("auth.sign_up"))
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => return err.into_response(),
    };

    match outcome.session {
        Some(issued) => match cookie_headers(&auth, &issued) {
            Ok(cookie) => (
                StatusCode::OK,
                cookie,
                Json(SignUpResponse {
                    token: Some(issued.token),
                    user: outcome.user,
                }),
            )
                .into_response(),
            Err(err) => err.into_response(),
        },
        None => (
            StatusCode::OK,
            Json(SignUpResponse {
                token: None,
                user: outcome.user,
            }),
        )
            .into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-in/email",
    request_body = SignInEmailRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 403, description = "Email not verified", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn sign_in_email(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthService>>,
    payload: Option<Json<SignInEmailRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return AuthError::InvalidRequestBody.into_response();
    };

    let meta = client_meta(&headers);
    let issued = match auth
        .sign_in_email(request, &meta)
        .instrument(info_span!("auth.sign_in"))
        .await
    {
        Ok(issued) => issued,
        Err(err) => return err.into_response(),
    };

    match cookie_headers(&auth, &issued) {
        Ok(cookie) => (
            StatusCode::OK,
            cookie,
            Json(SignInResponse {
                redirect: false,
                token: issued.token,
                user: issued.user,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    responses(
        (status = 200, description = "Session cleared", body = SignOutResponse)
    ),
    tag = "auth"
)]
pub async fn sign_out(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthService>>,
) -> Response {
    if let Err(err) = auth.sign_out(&headers).await {
        error!("Failed to delete session: {err}");
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    match auth.clear_session_cookie() {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clear cookie: {err}"),
    }
    (
        StatusCode::OK,
        response_headers,
        Json(SignOutResponse { success: true }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/get-session",
    responses(
        (status = 200, description = "Active session; the body is `null` without one", body = SessionPayload)
    ),
    tag = "auth"
)]
pub async fn get_session(
    headers: HeaderMap,
    Extension(auth): Extension<Arc<AuthService>>,
) -> Response {
    match auth.session_from_headers(&headers).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/ok",
    responses(
        (status = 200, description = "Auth handler is mounted", body = OkResponse)
    ),
    tag = "auth"
)]
pub async fn ok() -> impl IntoResponse {
    Json(OkResponse { ok: true })
}

pub async fn not_found() -> Response {
    AuthError::NotFound.into_response()
}
