//! Database helpers for users, credential accounts and sessions.

use anyhow::{anyhow, Context, Result};
use sqlx::PgPool;
use tracing::Instrument;

use super::token::{generate_session_token, hash_session_token};
use crate::db::{is_unique_violation, Account, Session, User, CREDENTIAL_PROVIDER};

/// Outcome when attempting to create a user with an email/password credential.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(User),
    Conflict,
}

/// A user together with the stored credential hash.
pub(super) struct CredentialRecord {
    pub(super) user: User,
    pub(super) password_hash: Option<String>,
}

/// Request metadata recorded on the session row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub(super) async fn insert_user_with_credential(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let query = r"
        INSERT INTO users (name, email)
        VALUES ($1, $2)
        RETURNING *
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let inserted = sqlx::query_as::<_, User>(query)
        .bind(name)
        .bind(email)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let user = match inserted {
        Ok(user) => user,
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(SignupOutcome::Conflict);
            }
            return Err(err).context("failed to insert user");
        }
    };

    // accountId is the user id for credential accounts.
    let query = r#"
        INSERT INTO accounts ("userId", "accountId", "providerId", password)
        VALUES ($1, $2, $3, $4)
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user.id)
        .bind(user.id.to_string())
        .bind(CREDENTIAL_PROVIDER)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert credential account")?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created(user))
}

/// Look up a user and their credential account by normalized email.
pub(super) async fn lookup_credential(
    pool: &PgPool,
    email: &str,
) -> Result<Option<CredentialRecord>> {
    let query = "SELECT * FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let user = sqlx::query_as::<_, User>(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    let Some(user) = user else {
        return Ok(None);
    };

    let query = r#"
        SELECT * FROM accounts
        WHERE "userId" = $1 AND "providerId" = $2
        LIMIT 1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let account = sqlx::query_as::<_, Account>(query)
        .bind(user.id)
        .bind(CREDENTIAL_PROVIDER)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup credential account")?;

    Ok(Some(CredentialRecord {
        user,
        password_hash: account.and_then(|account| account.password),
    }))
}

/// Create a session row and return the raw token alongside it. The user's
/// expired rows are removed by the same statement.
pub(super) async fn insert_session(
    pool: &PgPool,
    user_id: i32,
    ttl_seconds: i64,
    meta: &ClientMeta,
) -> Result<(String, Session)> {
    let query = r#"
        WITH purged AS (
            DELETE FROM sessions
            WHERE "userId" = $1 AND "expiresAt" <= NOW()
        )
        INSERT INTO sessions ("userId", "tokenHash", "expiresAt", "ipAddress", "userAgent")
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'), $4, $5)
        RETURNING *
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let result = sqlx::query_as::<_, Session>(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(ttl_seconds)
            .bind(meta.ip_address.as_deref())
            .bind(meta.user_agent.as_deref())
            .fetch_one(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(session) => return Ok((token, session)),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

/// Resolve an unexpired session and its user. An expired row for the hash is
/// deleted on the way.
pub(super) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<(Session, User)>> {
    let query = r#"
        DELETE FROM sessions
        WHERE "tokenHash" = $1
          AND "expiresAt" <= NOW()
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let purged = sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to purge expired session")?;
    if purged.rows_affected() > 0 {
        tracing::debug!("Removed expired session");
        return Ok(None);
    }

    let query = r#"
        SELECT * FROM sessions
        WHERE "tokenHash" = $1
          AND "expiresAt" > NOW()
        LIMIT 1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let session = sqlx::query_as::<_, Session>(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    let Some(session) = session else {
        return Ok(None);
    };

    let query = "SELECT * FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let user = sqlx::query_as::<_, User>(query)
        .bind(session.user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session user")?;

    Ok(user.map(|user| (session, user)))
}

/// Returns true when a row was removed.
pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<bool> {
    let query = r#"DELETE FROM sessions WHERE "tokenHash" = $1"#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(result.rows_affected() > 0)
}
