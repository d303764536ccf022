//! # Gibbon-Writer (email and password authentication)
//!
//! `gibbon` serves the Gibbon-Writer sign-in, sign-up and home pages and the
//! `/api/auth/*` endpoints behind them.
//!
//! ## Layout
//!
//! - [`db`]: Postgres pool, schema (users, posts and auth-owned tables) and row types.
//! - [`auth`]: the server auth service. Password hashing (Argon2id), session issuance
//!   and validation, and the request handler mounted under `/api/auth`.
//! - [`api`]: the HTTP router. Mounts the auth handler, the page routes and `/health`.
//! - [`client`]: HTTP client for the auth endpoints with a subscribable session store.
//! - [`pages`]: sign-in, sign-up and home page components, rendered with Tera.
//! - [`cli`]: argument parsing, telemetry and server start.
//!
//! ## Sessions
//!
//! A session is a random 32-byte token. Only its SHA-256 digest is stored; the
//! cookie carries the token signed with HMAC-SHA256 using `BETTER_AUTH_SECRET`.
//! Cookies with a bad signature are treated as absent.

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod db;
pub mod pages;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
