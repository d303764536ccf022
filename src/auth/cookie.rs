//! Session cookie and bearer header handling.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, USER_AGENT},
    HeaderMap, HeaderValue,
};

use super::{config::AuthConfig, storage::ClientMeta};

pub const SESSION_COOKIE_NAME: &str = "gibbon.session_token";

/// `HttpOnly` cookie carrying the signed token. `persistent == false` omits
/// `Max-Age` so the browser drops it at the end of the session.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    signed_token: &str,
    persistent: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={signed_token}; Path=/; HttpOnly; SameSite=Lax");
    if persistent {
        cookie.push_str(&format!("; Max-Age={}", config.session_ttl_seconds()));
    }
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Signed token from `Authorization: Bearer` or, failing that, the cookie.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME)
                .then(|| val.trim().to_string())
                .filter(|val| !val.is_empty())
        })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Client IP (first `x-forwarded-for` hop, else `x-real-ip`) and user agent.
pub fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let ip_address = forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
        .map(str::to_string);
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    ClientMeta {
        ip_address,
        user_agent,
    }
}
