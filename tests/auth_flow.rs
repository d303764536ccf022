//! Database-backed auth flows. Each test starts its own Postgres container and
//! returns early when no container runtime is available.

mod common;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use common::TestDb;
use gibbon::{
    api,
    auth::{
        types::{SignInEmailRequest, SignUpEmailRequest},
        AuthConfig, AuthError, AuthService, ClientMeta, EmailPasswordPolicy,
        SESSION_COOKIE_NAME,
    },
    db::{self, NewPost},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn config() -> AuthConfig {
    AuthConfig::new(
        "http://localhost:13200".to_string(),
        SecretString::from("integration-secret-integration-secret"),
    )
}

fn sign_up_request(email: &str) -> SignUpEmailRequest {
    SignUpEmailRequest {
        name: "Test User".to_string(),
        email: email.to_string(),
        password: "password123".to_string(),
    }
}

fn cookie_header(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={token}"))?,
    );
    Ok(headers)
}

/// `name=value` part of the first `Set-Cookie` header.
fn set_cookie_pair(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn sign_up_session_and_sign_out() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let auth = AuthService::new(db.pool.clone(), config());
    let meta = ClientMeta {
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("integration".to_string()),
    };

    let outcome = auth
        .sign_up_email(sign_up_request("  Alice@Example.com "), &meta)
        .await?;
    assert_eq!(outcome.user.email, "alice@example.com");
    assert_eq!(outcome.user.name, "Test User");
    let issued = outcome.session.context("sign-up should issue a session")?;
    assert!(issued.persistent);

    let headers = cookie_header(&issued.token)?;
    let payload = auth
        .session_from_headers(&headers)
        .await?
        .context("session should resolve")?;
    assert_eq!(payload.user.id, outcome.user.id);
    assert_eq!(payload.session.user_id, outcome.user.id);
    assert_eq!(payload.session.ip_address.as_deref(), Some("203.0.113.7"));
    assert!(payload.session.expires_at > chrono::Utc::now());

    assert!(auth.sign_out(&headers).await?);
    assert!(auth.session_from_headers(&headers).await?.is_none());
    assert!(!auth.sign_out(&headers).await?);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let auth = AuthService::new(db.pool.clone(), config());
    let meta = ClientMeta::default();

    auth.sign_up_email(sign_up_request("bob@example.com"), &meta)
        .await?;
    let second = auth
        .sign_up_email(sign_up_request("BOB@example.com"), &meta)
        .await;
    assert!(matches!(second, Err(AuthError::UserAlreadyExists)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_share_one_error() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let auth = AuthService::new(db.pool.clone(), config());
    let meta = ClientMeta::default();
    auth.sign_up_email(sign_up_request("carol@example.com"), &meta)
        .await?;

    for (email, password) in [
        ("carol@example.com", "wrongpassword"),
        ("nobody@example.com", "password123"),
    ] {
        let result = auth
            .sign_in_email(
                SignInEmailRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                    remember_me: None,
                },
                &meta,
            )
            .await;
        assert!(
            matches!(result, Err(AuthError::InvalidEmailOrPassword)),
            "{email}"
        );
    }

    let issued = auth
        .sign_in_email(
            SignInEmailRequest {
                email: "Carol@Example.com".to_string(),
                password: "password123".to_string(),
                remember_me: Some(false),
            },
            &meta,
        )
        .await?;
    assert!(!issued.persistent);
    let cookie = auth.session_cookie(&issued)?;
    assert!(!cookie.to_str()?.contains("Max-Age"));
    Ok(())
}

#[tokio::test]
async fn user_without_credential_account_cannot_sign_in() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    sqlx::query("INSERT INTO users (name, email) VALUES ('Erin', 'erin@example.com')")
        .execute(&db.pool)
        .await?;
    let auth = AuthService::new(db.pool.clone(), config());

    let result = auth
        .sign_in_email(
            SignInEmailRequest {
                email: "erin@example.com".to_string(),
                password: "password123".to_string(),
                remember_me: None,
            },
            &ClientMeta::default(),
        )
        .await;
    assert!(matches!(result, Err(AuthError::InvalidEmailOrPassword)));
    Ok(())
}

#[tokio::test]
async fn expired_sessions_are_removed() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let auth = AuthService::new(db.pool.clone(), config().with_session_ttl_seconds(1));
    let meta = ClientMeta::default();
    auth.sign_up_email(sign_up_request("frank@example.com"), &meta)
        .await?;
    let sign_in = || SignInEmailRequest {
        email: "frank@example.com".to_string(),
        password: "password123".to_string(),
        remember_me: None,
    };

    let first = auth.sign_in_email(sign_in(), &meta).await?;
    auth.sign_in_email(sign_in(), &meta).await?;
    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    // Resolving an expired token deletes its row.
    let headers = cookie_header(&first.token)?;
    assert!(auth.session_from_headers(&headers).await?.is_none());
    let first_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE id = $1")
        .bind(first.session.id.parse::<i32>()?)
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(first_rows, 0);

    // A new session clears the rest of the user's expired rows.
    let fresh = auth.sign_in_email(sign_in(), &meta).await?;
    let rows: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM sessions WHERE "userId" = $1"#)
        .bind(fresh.user.id.parse::<i32>()?)
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(rows, 1);
    let expired: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM sessions WHERE "expiresAt" <= NOW()"#)
            .fetch_one(&db.pool)
            .await?;
    assert_eq!(expired, 0);
    Ok(())
}

#[tokio::test]
async fn verification_required_withholds_session() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let policy = EmailPasswordPolicy {
        require_email_verification: true,
        ..EmailPasswordPolicy::default()
    };
    let auth = AuthService::new(db.pool.clone(), config().with_email_and_password(policy));
    let meta = ClientMeta::default();

    let outcome = auth
        .sign_up_email(sign_up_request("dave@example.com"), &meta)
        .await?;
    assert!(outcome.session.is_none());
    assert!(!outcome.user.email_verified);

    let result = auth
        .sign_in_email(
            SignInEmailRequest {
                email: "dave@example.com".to_string(),
                password: "password123".to_string(),
                remember_me: None,
            },
            &meta,
        )
        .await;
    assert!(matches!(result, Err(AuthError::EmailNotVerified)));
    Ok(())
}

#[tokio::test]
async fn posts_belong_to_their_author() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let auth = AuthService::new(db.pool.clone(), config());
    let outcome = auth
        .sign_up_email(sign_up_request("erin@example.com"), &ClientMeta::default())
        .await?;
    let author_id: i32 = outcome.user.id.parse()?;

    let first = db::insert_post(
        &db.pool,
        &NewPost {
            title: "First".to_string(),
            content: None,
            author_id,
        },
    )
    .await?;
    db::insert_post(
        &db.pool,
        &NewPost {
            title: "Second".to_string(),
            content: Some("body".to_string()),
            author_id,
        },
    )
    .await?;
    assert_eq!(first.author_id, author_id);
    assert_eq!(first.content, None);

    let posts = db::posts_by_author(&db.pool, author_id).await?;
    let titles: Vec<&str> = posts.iter().map(|post| post.title.as_str()).collect();
    assert_eq!(titles, vec!["Second", "First"]);

    let orphan = db::insert_post(
        &db.pool,
        &NewPost {
            title: "Orphan".to_string(),
            content: None,
            author_id: author_id + 1000,
        },
    )
    .await;
    assert!(orphan.is_err());
    Ok(())
}

#[tokio::test]
async fn http_flow_through_router() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let auth = Arc::new(AuthService::new(db.pool.clone(), config()));
    let app: Router = api::router(auth, db.pool.clone())?;

    // JSON sign-up sets the cookie
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/sign-up/email")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&json!({
            "name": "Frank",
            "email": "frank@example.com",
            "password": "password123"
        }))?))?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie_pair(&response).context("sign-up should set a cookie")?;
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["user"]["email"], "frank@example.com");

    // get-session sees it
    let request = Request::builder()
        .uri("/api/auth/get-session")
        .header(COOKIE, &cookie)
        .body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["user"]["name"], "Frank");

    // duplicate sign-up
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/sign-up/email")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&json!({
            "name": "Frank",
            "email": "frank@example.com",
            "password": "password123"
        }))?))?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["code"], "USER_ALREADY_EXISTS");

    // page sign-in redirects home with a fresh cookie
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/sign-in")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=frank%40example.com&password=password123"))?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
        Some("/")
    );
    let page_cookie = set_cookie_pair(&response).context("sign-in should set a cookie")?;

    // home greets the user
    let request = Request::builder()
        .uri("/")
        .header(COOKIE, &page_cookie)
        .body(Body::empty())?;
    let html = body_text(app.clone().oneshot(request).await?).await?;
    assert!(html.contains("こんにちは、Frankさん"));
    assert!(html.contains("メール: frank@example.com"));

    // page sign-out ends the session
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/sign-out")
        .header(COOKIE, &page_cookie)
        .body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let request = Request::builder()
        .uri("/api/auth/get-session")
        .header(COOKIE, &page_cookie)
        .body(Body::empty())?;
    let body = body_text(app.oneshot(request).await?).await?;
    assert_eq!(body, "null");
    Ok(())
}
