//! HTTP router: page routes, `/health`, and the auth handler nested under
//! `/api/auth`.

use crate::{
    api::handlers::{health, pages},
    auth::{AuthConfig, AuthService},
    db,
    pages::{HOME_PATH, SIGN_IN_PATH, SIGN_OUT_PATH, SIGN_UP_PATH},
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub(crate) mod handlers;

/// Prefix the auth handler is mounted under.
pub const AUTH_BASE_PATH: &str = "/api/auth";

/// Build the full application router.
///
/// # Errors
/// Returns an error if the configured base URL has no usable origin.
pub fn router(auth: Arc<AuthService>, pool: PgPool) -> Result<Router> {
    let origin = frontend_origin(auth.config().base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(origin))
        .allow_credentials(true);

    let app = Router::new()
        .route(HOME_PATH, get(pages::home))
        .route(
            SIGN_IN_PATH,
            get(pages::sign_in_page).post(pages::sign_in_submit),
        )
        .route(
            SIGN_UP_PATH,
            get(pages::sign_up_page).post(pages::sign_up_submit),
        )
        .route(SIGN_OUT_PATH, post(pages::sign_out))
        .route("/health", get(health::health))
        .nest(AUTH_BASE_PATH, auth.clone().handler())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth))
                .layer(Extension(pool)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, auth_config: AuthConfig) -> Result<()> {
    let pool = db::connect(&dsn).await?;

    db::apply_schema(&pool)
        .await
        .context("Failed to apply database schema")?;

    if auth_config.uses_development_secret() {
        info!("Using the development auth secret");
    }

    let auth = Arc::new(AuthService::new(pool.clone(), auth_config));
    let app = router(auth, pool)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(base_url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Base URL must include a valid host: {base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
