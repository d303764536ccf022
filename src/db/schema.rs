//! Row types for the tables in `sql/schema.sql`.
//!
//! Column names are camelCase in the database, so every multi-word field
//! carries an explicit `sqlx(rename)`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// `accounts."providerId"` for email/password credentials.
pub const CREDENTIAL_PROVIDER: &str = "credential";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[sqlx(rename = "emailVerified")]
    pub email_verified: bool,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: Option<String>,
    #[sqlx(rename = "authorId")]
    pub author_id: i32,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for `posts`; ids and timestamps come from column defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
    pub author_id: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i32,
    #[sqlx(rename = "userId")]
    pub user_id: i32,
    #[sqlx(rename = "accountId")]
    pub account_id: String,
    #[sqlx(rename = "providerId")]
    pub provider_id: String,
    /// Argon2id PHC string; `None` for non-credential providers.
    pub password: Option<String>,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i32,
    #[sqlx(rename = "userId")]
    pub user_id: i32,
    #[sqlx(rename = "tokenHash")]
    pub token_hash: Vec<u8>,
    #[sqlx(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[sqlx(rename = "ipAddress")]
    pub ip_address: Option<String>,
    #[sqlx(rename = "userAgent")]
    pub user_agent: Option<String>,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
