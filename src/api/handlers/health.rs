use crate::GIT_COMMIT_HASH;
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgPool};
use tracing::{debug, error, info_span, Instrument};
use utoipa::ToSchema;

/// Build and database status reported by `/health`.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

impl Health {
    fn new(database_ok: bool) -> Self {
        Self {
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "ok" } else { "error" }.to_string(),
        }
    }

    /// `name:version:short_hash`
    fn app_header(&self) -> HeaderMap {
        let short_hash = self.commit.get(0..7).unwrap_or_default();
        let mut headers = HeaderMap::new();
        match format!("{}:{}:{short_hash}", self.name, self.version).parse::<HeaderValue>() {
            Ok(value) => {
                headers.insert("X-App", value);
            }
            Err(err) => error!("Failed to parse X-App header: {err}"),
        }
        headers
    }
}

async fn ping_database(pool: &PgPool) -> bool {
    let acquire_span = info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    );
    let mut conn = match pool.acquire().instrument(acquire_span).await {
        Ok(conn) => conn,
        Err(err) => {
            error!("Failed to acquire database connection: {err}");
            return false;
        }
    };

    let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
    if let Err(err) = conn.ping().instrument(ping_span).await {
        error!("Failed to ping database: {err}");
        return false;
    }
    true
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database is reachable", body = Health),
        (status = 503, description = "Database is unreachable", body = Health)
    ),
    tag = "health"
)]
pub async fn health(pool: Extension<PgPool>) -> impl IntoResponse {
    let database_ok = ping_database(&pool).await;
    let health = Health::new(database_ok);
    let headers = health.app_header();

    let status = if database_ok {
        debug!("Database connection is healthy");
        StatusCode::OK
    } else {
        debug!("Database connection is unhealthy");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, Json(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_header_has_name_version_and_short_hash() {
        let headers = Health::new(true).app_header();
        let value = headers
            .get("X-App")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let expected_hash = GIT_COMMIT_HASH.get(0..7).unwrap_or_default();
        assert_eq!(
            value,
            format!(
                "{}:{}:{expected_hash}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )
        );
    }

    #[test]
    fn database_field_follows_ping() {
        assert_eq!(Health::new(true).database, "ok");
        assert_eq!(Health::new(false).database, "error");
    }
}
