#![cfg(test)]
use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Database for service tests.
///
/// With `DATABASE_URL` set, the shared database is migrated once and a fresh
/// pool is returned. Otherwise every call gets its own migrated in-memory SQLite.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    if std::env::var("DATABASE_URL").is_err() {
        let db = connect_with_config(&DatabaseConfig::in_memory()).await?;
        migration::Migrator::up(&db, None).await?;
        return Ok(db);
    }

    MIGRATED
        .get_or_init(|| async {
            let cfg = DatabaseConfig::from_env();
            let db = connect_with_config(&cfg).await.expect("connect db for migration");
            migration::Migrator::up(&db, None).await.expect("migrate up");
            drop(db);
        })
        .await;

    let mut cfg = DatabaseConfig::from_env();
    cfg.min_connections = 1;
    cfg.acquire_timeout = std::time::Duration::from_secs(10);
    let db = connect_with_config(&cfg).await?;
    Ok(db)
}

/// Unique suffix for names that must not collide on a shared database.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
