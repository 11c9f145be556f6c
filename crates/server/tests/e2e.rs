use std::net::SocketAddr;

use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use server::routes;
use server::startup::build_state;

struct TestApp {
    base_url: String,
    _dir: TempDir,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn start_server() -> anyhow::Result<TestApp> {
    let dir = tempfile::tempdir()?;
    let toml = format!(
        r#"
[database]
url = "sqlite::memory:"
min_connections = 1
max_connections = 1
idle_timeout_secs = 86400
max_lifetime_secs = 86400

[auth]
jwt_secret = "e2e-secret-0123456789"

[media]
root = "{}"
allowed_extensions = ["png", "txt"]

[exchange]
data_dir = "{}"
"#,
        dir.path().join("media").display(),
        dir.path().join("exchange").display(),
    );
    let mut cfg = configs::load_from_str(&toml)?;
    cfg.normalize_and_validate()?;
    let state = build_state(&cfg).await?;
    let app = routes::build_router(state, CorsLayer::very_permissive(), 1024 * 1024);

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {e}");
        }
    });
    Ok(TestApp { base_url: format!("http://{}:{}", addr.ip(), addr.port()), _dir: dir })
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().cookie_store(true).build().expect("reqwest client")
}

/// Registers and logs in; the client keeps the auth cookie.
async fn signed_in(app: &TestApp) -> anyhow::Result<reqwest::Client> {
    let c = client();
    let res = c
        .post(app.url("/auth/register"))
        .json(&json!({"email": "e2e@example.com", "name": "E2E", "password": "StrongPass123"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let res = c
        .post(app.url("/auth/login"))
        .json(&json!({"email": "e2e@example.com", "password": "StrongPass123"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert!(res.headers().get("set-cookie").is_some());
    Ok(c)
}

#[tokio::test]
async fn e2e_category_tree_drop() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = start_server().await?;
    let c = signed_in(&app).await?;

    let mut ids = Vec::new();
    for name in ["Books", "Music", "Jazz"] {
        let body: Value = c.post(app.url("/admin/categories")).json(&json!({"name": name})).send().await?.json().await?;
        ids.push(body["data"]["id"].as_i64().unwrap_or_default());
    }

    // Jazz under Music
    let res = c
        .post(app.url(&format!("/admin/categories/{}/move", ids[2])))
        .json(&json!({"target_id": ids[1], "position": "over"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let plan: Value = res.json().await?;
    assert_eq!(plan["new_parent_id"], ids[1]);

    // Music under Jazz would be a cycle
    let res = c
        .post(app.url(&format!("/admin/categories/{}/move", ids[1])))
        .json(&json!({"target_id": ids[2], "position": "over"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn e2e_cart_rule_set() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = start_server().await?;
    let c = signed_in(&app).await?;

    let body: Value = c
        .post(app.url("/admin/rules"))
        .json(&json!({"name": "Big carts", "scope": "Cart"}))
        .send()
        .await?
        .json()
        .await?;
    let id = body["data"]["id"].as_i64().unwrap_or_default();

    let res = c
        .post(app.url(&format!("/admin/rules/{id}/rules")))
        .json(&json!({"rule_type": "CartTotal", "operator": ">=", "value": "100"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let res = c
        .post(app.url(&format!("/admin/rules/{id}/rules")))
        .json(&json!({"rule_type": "CartTotal", "operator": "Contains", "value": "1"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);

    for (total, expected) in [(150.0, true), (20.0, false)] {
        let body: Value = c
            .post(app.url(&format!("/admin/rules/{id}/test-cart")))
            .json(&json!({"total": total}))
            .send()
            .await?
            .json()
            .await?;
        assert_eq!(body["matched"], expected);
    }

    let descriptors: Value = c.get(app.url("/admin/rules/descriptors/Cart")).send().await?.json().await?;
    assert!(descriptors.as_array().map(|d| d.iter().any(|x| x["name"] == "CartTotal")).unwrap_or(false));
    Ok(())
}

#[tokio::test]
async fn e2e_roxy_file_manager() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = start_server().await?;
    let c = signed_in(&app).await?;

    let status: Value = c
        .post(app.url("/admin/roxy?a=CREATEDIR"))
        .form(&[("d", "/"), ("n", "images")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(status["res"], "ok");

    let part = reqwest::multipart::Part::bytes(b"hello".to_vec()).file_name("notes.txt");
    let form = reqwest::multipart::Form::new().text("d", "/images").part("files[]", part);
    let status: Value = c.post(app.url("/admin/roxy?a=UPLOAD")).multipart(form).send().await?.json().await?;
    assert_eq!(status["res"], "ok");

    let files: Value = c.post(app.url("/admin/roxy?a=FILESLIST&d=/images")).send().await?.json().await?;
    assert_eq!(files[0]["p"], "/images/notes.txt");

    let res = c.post(app.url("/admin/roxy?a=DOWNLOAD&f=/images/notes.txt")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.bytes().await?.as_ref(), b"hello");

    let status: Value = c.post(app.url("/admin/roxy?a=DELETEDIR")).form(&[("d", "/images")]).send().await?.json().await?;
    assert_eq!(status["res"], "error");
    Ok(())
}

#[tokio::test]
async fn e2e_logout_clears_cookie() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let app = start_server().await?;
    let c = signed_in(&app).await?;
    assert_eq!(c.get(app.url("/auth/me")).send().await?.status(), HttpStatusCode::OK);

    let res = c.post(app.url("/auth/logout")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NO_CONTENT);
    assert_eq!(c.get(app.url("/auth/me")).send().await?.status(), HttpStatusCode::BAD_REQUEST);
    Ok(())
}
