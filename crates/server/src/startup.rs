use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::Router;
use common::utils::logging::init_from_env;
use configs::AppConfig;
use dotenvy::dotenv;
use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, auth};
use service::exchange::task::DbTaskScheduler;
use service::media::{FileManager, LocalMediaFileSystem};
use service::rules::RuleEngine;

/// Compiled rule sets kept in memory.
const RULE_CACHE_CAPACITY: u64 = 1_000;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Wire the application state from a validated config.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<auth::ServerState> {
    let db = connect_with_config(&DatabaseConfig::from(&cfg.database)).await?;
    if std::env::var("SKIP_MIGRATIONS").is_err() {
        migration::Migrator::up(&db, None).await?;
        info!("database migrations applied");
    }
    let media = LocalMediaFileSystem::new(&cfg.media.root).await?;
    Ok(auth::ServerState {
        db,
        auth: auth::ServerAuthConfig {
            jwt_secret: cfg.auth.jwt_secret.clone(),
            token_ttl_hours: cfg.auth.token_ttl_hours,
        },
        rules: RuleEngine::new(RULE_CACHE_CAPACITY),
        files: FileManager::new(Arc::new(media), &cfg.media),
        scheduler: Arc::new(DbTaskScheduler),
        exchange_dir: PathBuf::from(&cfg.exchange.data_dir),
    })
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_from_env();

    let cfg = AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    common::env::ensure_env(&cfg.media.root, &cfg.exchange.data_dir)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let state = build_state(&cfg).await?;
    let upload_limit = usize::try_from(cfg.media.max_upload_bytes).unwrap_or(usize::MAX);
    let app: Router = routes::build_router(state, build_cors(), upload_limit);

    let addr: SocketAddr = cfg
        .server
        .addr()
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("{}: {e}", cfg.server.addr())))?;
    info!(%addr, "starting admin server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
