//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::info;

/// Create the media root and the exchange data directory when missing.
pub async fn ensure_env(media_root: &str, data_dir: &str) -> anyhow::Result<()> {
    for dir in [media_root, data_dir] {
        if tokio::fs::metadata(dir).await.is_err() {
            info!(%dir, "creating missing directory");
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {dir}: {e}"))?;
    }
    Ok(())
}
