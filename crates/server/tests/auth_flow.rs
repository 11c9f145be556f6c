use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use server::routes;
use server::startup::build_state;

const SECRET: &str = "test-secret-0123456789";

fn config(dir: &TempDir) -> anyhow::Result<configs::AppConfig> {
    let toml = format!(
        r#"
[database]
url = "sqlite::memory:"
min_connections = 1
max_connections = 1
idle_timeout_secs = 86400
max_lifetime_secs = 86400

[auth]
jwt_secret = "{SECRET}"

[media]
root = "{media}"

[exchange]
data_dir = "{exchange}"
"#,
        media = dir.path().join("media").display(),
        exchange = dir.path().join("exchange").display(),
    );
    let mut cfg = configs::load_from_str(&toml)?;
    cfg.normalize_and_validate()?;
    Ok(cfg)
}

async fn build_app(dir: &TempDir) -> anyhow::Result<Router> {
    let cfg = config(dir)?;
    let state = build_state(&cfg).await?;
    Ok(routes::build_router(state, tower_http::cors::CorsLayer::very_permissive(), 1024 * 1024))
}

async fn send(app: &Router, req: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let res = app.clone().oneshot(req).await?;
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    Ok((status, body))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

async fn login(app: &Router) -> anyhow::Result<String> {
    let email = format!("admin_{}@example.com", Uuid::new_v4().simple());
    let (status, _) = send(app, json_request("POST", "/auth/register", None, json!({"email": email, "name": "Admin", "password": "Passw0rd!"}))?).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(app, json_request("POST", "/auth/login", None, json!({"email": email, "password": "Passw0rd!"}))?).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body["token"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn health_is_public_and_admin_needs_a_token() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let app = build_app(&dir).await?;

    let (status, body) = send(&app, Request::get("/health").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send(&app, Request::get("/admin/categories").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad = Request::get("/admin/categories").header(header::AUTHORIZATION, "Bearer not-a-jwt").body(Body::empty())?;
    let (status, _) = send(&app, bad).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_token_reaches_me_and_admin_crud() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let app = build_app(&dir).await?;
    let token = login(&app).await?;

    let me = Request::get("/auth/me").header(header::AUTHORIZATION, format!("Bearer {token}")).body(Body::empty())?;
    let (status, body) = send(&app, me).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Admin");

    let (status, body) = send(&app, json_request("POST", "/admin/categories", Some(&token), json!({"name": "Books", "published": true}))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let id = body["data"]["id"].as_i64().unwrap_or_default();
    assert_eq!(body["redirect"], format!("/admin/category/{id}"));

    let (status, body) = send(&app, json_request("POST", "/admin/categories", Some(&token), json!({"name": "  "}))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let missing = Request::get("/admin/categories/999999").header(header::AUTHORIZATION, format!("Bearer {token}")).body(Body::empty())?;
    let (status, body) = send(&app, missing).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["title"], "Not Found");

    let log = Request::get("/admin/activity-log?activity_type=AddNewCategory")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let (status, body) = send(&app, log).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let app = build_app(&dir).await?;
    let (status, _) = send(&app, json_request("POST", "/auth/register", None, json!({"email": "ops@example.com", "name": "Ops", "password": "Passw0rd!"}))?).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, json_request("POST", "/auth/login", None, json!({"email": "ops@example.com", "password": "nope-nope"}))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
