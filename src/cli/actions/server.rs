use crate::{api, auth::AuthConfig, cli::telemetry};
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub auth_config: AuthConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        base_url = args.auth_config.base_url(),
        session_ttl_seconds = args.auth_config.session_ttl_seconds(),
        "starting server"
    );

    let result = api::new(args.port, args.dsn, args.auth_config).await;

    telemetry::shutdown_tracer();

    result
}
