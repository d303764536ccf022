use axum::Json;
use utoipa::{
    openapi::{Contact, License},
    OpenApi,
};

use super::handlers;
use super::types::{
    ErrorBody, OkResponse, SessionInfo, SessionPayload, SignInEmailRequest, SignInResponse,
    SignOutResponse, SignUpEmailRequest, SignUpResponse, UserInfo,
};
use crate::api::handlers::health;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::sign_up_email,
        handlers::sign_in_email,
        handlers::sign_out,
        handlers::get_session,
        handlers::ok,
        health::health
    ),
    components(schemas(
        SignUpEmailRequest,
        SignInEmailRequest,
        SignUpResponse,
        SignInResponse,
        SignOutResponse,
        SessionPayload,
        SessionInfo,
        UserInfo,
        OkResponse,
        ErrorBody,
        health::Health
    )),
    tags(
        (name = "auth", description = "Email and password authentication"),
        (name = "health", description = "Service health")
    )
)]
struct AuthApiDoc;

/// OpenAPI document for `/api/auth` and `/health`, with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = AuthApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = cargo_license();
    doc
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

fn cargo_contact() -> Option<Contact> {
    // First of the `;` separated Cargo authors, as "Name <email>" or "Name".
    let (name, email) = env!("CARGO_PKG_AUTHORS")
        .split(';')
        .next()
        .map(parse_author)?;
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    let (name, email) = author.split_once('<').unwrap_or((author, ""));
    (optional_str(name), optional_str(email.trim_end_matches(['>', ' '])))
}
