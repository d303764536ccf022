//! Map parsed arguments to an [`Action`]. The auth configuration is resolved
//! here so a production start without a usable secret fails before any I/O.

use crate::auth::{resolve_secret, AuthConfig, EmailPasswordPolicy};
use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::{Context, Result};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(13200);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Url::parse(&auth_opts.base_url)
        .with_context(|| format!("invalid BETTER_AUTH_URL: {}", auth_opts.base_url))?;

    let secret = resolve_secret(auth_opts.secret, auth_opts.environment)?;

    let policy = EmailPasswordPolicy {
        require_email_verification: auth_opts.require_email_verification,
        ..EmailPasswordPolicy::default()
    };

    let auth_config = AuthConfig::new(auth_opts.base_url, secret)
        .with_email_and_password(policy)
        .with_session_ttl_seconds(auth_opts.session_ttl_seconds);

    Ok(Action::Server(Args {
        port,
        dsn,
        auth_config,
    }))
}
