//! Post queries. No page reads posts yet; these back the schema's insert and
//! select shapes.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::Instrument;

use super::schema::{NewPost, Post};

/// Insert a post and return the stored row.
///
/// # Errors
/// Returns an error if the insert fails, e.g. when `author_id` does not exist.
pub async fn insert_post(pool: &PgPool, post: &NewPost) -> Result<Post> {
    let query = r#"
        INSERT INTO posts (title, content, "authorId")
        VALUES ($1, $2, $3)
        RETURNING *
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query_as::<_, Post>(query)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.author_id)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert post")
}

/// All posts written by `author_id`, newest first.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn posts_by_author(pool: &PgPool, author_id: i32) -> Result<Vec<Post>> {
    let query = r#"SELECT * FROM posts WHERE "authorId" = $1 ORDER BY "createdAt" DESC, id DESC"#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    sqlx::query_as::<_, Post>(query)
        .bind(author_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list posts")
}
