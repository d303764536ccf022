use crate::auth::{Environment, DEFAULT_BASE_URL};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_SECRET: &str = "secret";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_REQUIRE_EMAIL_VERIFICATION: &str = "require-email-verification";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Public base URL of the app, used for cookies and CORS")
                .env("BETTER_AUTH_URL")
                .default_value(DEFAULT_BASE_URL),
        )
        .arg(
            Arg::new(ARG_SECRET)
                .long(ARG_SECRET)
                .help("Secret used to sign session cookies")
                .env("BETTER_AUTH_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long("env")
                .help("Runtime environment: development or production")
                .env("GIBBON_ENV")
                .default_value("development")
                .value_parser(|value: &str| value.parse::<Environment>()),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .env("GIBBON_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REQUIRE_EMAIL_VERIFICATION)
                .long(ARG_REQUIRE_EMAIL_VERIFICATION)
                .help("Refuse sign-in until the email address is verified")
                .env("GIBBON_REQUIRE_EMAIL_VERIFICATION")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug)]
pub struct Options {
    pub base_url: String,
    pub secret: Option<String>,
    pub environment: Environment,
    pub session_ttl_seconds: i64,
    pub require_email_verification: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            base_url: matches
                .get_one::<String>(ARG_BASE_URL)
                .cloned()
                .context("missing required argument: --base-url")?,
            secret: matches.get_one::<String>(ARG_SECRET).cloned(),
            environment: matches
                .get_one::<Environment>(ARG_ENVIRONMENT)
                .copied()
                .unwrap_or_default(),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            require_email_verification: matches.get_flag(ARG_REQUIRE_EMAIL_VERIFICATION),
        })
    }
}
