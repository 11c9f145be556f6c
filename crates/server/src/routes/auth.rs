use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::{Request, State}, http::{Method, StatusCode}, middleware::Next, response::Response, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use service::auth::domain::{LoginInput, RegisterInput};
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::{verify_token, AuthConfig, AuthService};
use service::exchange::task::TaskScheduler;
use service::media::FileManager;
use service::rules::RuleEngine;

use crate::admin::CurrentAdmin;
use crate::errors::JsonApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: ServerAuthConfig,
    pub rules: RuleEngine,
    pub files: FileManager,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub exchange_dir: PathBuf,
}

impl ServerState {
    fn auth_service(&self) -> AuthService<SeaOrmAuthRepository> {
        let repo = Arc::new(SeaOrmAuthRepository { db: self.db.clone() });
        AuthService::new(repo, AuthConfig::new(self.auth.jwt_secret.clone(), self.auth.token_ttl_hours))
    }
}

#[derive(Serialize)]
pub struct RegisterOutput { pub user_id: i32 }

#[derive(Serialize)]
pub struct MeOutput { pub user_id: i32, pub email: String, pub name: String }

#[derive(Serialize)]
pub struct LoginOutput { pub user_id: i32, pub email: String, pub name: String, pub token: String, pub expires_at: usize }

#[utoipa::path(post, path = "/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 200, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(State(state): State<ServerState>, Json(input): Json<RegisterInput>) -> Result<Json<RegisterOutput>, JsonApiError> {
    let user = state.auth_service().register(input).await?;
    Ok(Json(RegisterOutput { user_id: user.id }))
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized")))]
pub async fn login(State(state): State<ServerState>, jar: CookieJar, Json(input): Json<LoginInput>) -> Result<(CookieJar, Json<LoginOutput>), JsonApiError> {
    let session = state.auth_service().login(input).await?;
    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    let user = session.user;
    let out = LoginOutput { user_id: user.id, email: user.email, name: user.name, token: session.token, expires_at: session.expires_at };
    Ok((jar.add(cookie), Json(out)))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<ServerState>, admin: CurrentAdmin) -> Result<Json<MeOutput>, JsonApiError> {
    let user = state.auth_service().current_user(&admin.0).await?;
    Ok(Json(MeOutput { user_id: user.id, email: user.email, name: user.name }))
}

fn is_public(path: &str, method: &Method) -> bool {
    path == "/health"
        || path == "/metrics"
        || path == "/auth/login"
        || path == "/auth/register"
        || path == "/auth/logout"
        || path.starts_with("/docs")
        || path.starts_with("/api-docs")
        || method == Method::OPTIONS
}

fn cookie_token(req: &Request) -> Option<String> {
    let header = req.headers().get(axum::http::header::COOKIE)?.to_str().ok()?;
    header
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("auth_token="))
        .map(str::to_string)
        .find(|t| !t.is_empty())
}

/// Global middleware: everything except public paths needs `Authorization: Bearer <token>`
/// or the `auth_token` cookie. A missing token is 400; an invalid or expired one is 401.
/// Valid claims are stored in the request extensions for [`CurrentAdmin`].
pub async fn require_bearer_token_state(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = req.uri().path().to_string();
    if is_public(&path, req.method()) {
        return Ok(next.run(req).await);
    }

    let authz = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let token = match authz {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(t) => t.trim().to_string(),
            None => {
                tracing::warn!(path = %path, "invalid Authorization format (expect Bearer)");
                return Err(StatusCode::UNAUTHORIZED);
            }
        },
        None => match cookie_token(&req) {
            Some(t) => t,
            None => {
                tracing::warn!(path = %path, "missing Authorization header and auth_token cookie");
                return Err(StatusCode::BAD_REQUEST);
            }
        },
    };

    match verify_token(&state.auth.jwt_secret, &token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::error!(path = %path, err = %e, "token validation failed");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
