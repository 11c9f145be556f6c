use crate::db::{connect_with_config, DatabaseConfig};
use anyhow::Result;
use migration::MigratorTrait;
use sea_orm::{ConnectionTrait, Statement};

#[tokio::test]
async fn in_memory_connection_runs_migrations() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = connect_with_config(&DatabaseConfig::in_memory()).await?;
    migration::Migrator::up(&db, None).await?;

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(backend, "SELECT COUNT(*) AS n FROM rule_set".to_string()))
        .await?;
    let n: i64 = row.expect("count row").try_get("", "n")?;
    assert_eq!(n, 0);
    Ok(())
}

#[test]
fn in_memory_pool_is_single_connection() {
    let cfg = DatabaseConfig::in_memory();
    assert_eq!(cfg.max_connections, 1);
    assert_eq!(cfg.min_connections, 1);
    assert!(cfg.url.starts_with("sqlite:"));
}
