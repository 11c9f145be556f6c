use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::ServiceError;

/// Normalizes a virtual path to `/a/b`. The root is `/`.
///
/// `..` segments and drive or UNC prefixes are rejected; `.` and empty segments are dropped.
pub fn normalize(path: &str) -> Result<String, ServiceError> {
    let unified = path.replace('\\', "/");
    let mut parts = Vec::new();
    for seg in unified.split('/') {
        match seg.trim() {
            "" | "." => {}
            ".." => return Err(ServiceError::validation(format!("path escapes the media root: {path}"))),
            s if s.contains(':') || s.chars().any(char::is_control) => {
                return Err(ServiceError::validation(format!("invalid path: {path}")))
            }
            s => parts.push(s),
        }
    }
    Ok(format!("/{}", parts.join("/")))
}

/// Single path segment for create and rename operations.
pub fn validate_name(name: &str) -> Result<&str, ServiceError> {
    let name = name.trim();
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':'])
        || name.chars().any(|c| c.is_control() || matches!(c, '*' | '?' | '"' | '<' | '>' | '|'))
    {
        return Err(ServiceError::validation(format!("invalid name: {name}")));
    }
    Ok(name)
}

/// Joins a normalized directory and a validated name.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" { format!("/{name}") } else { format!("{dir}/{name}") }
}

/// Parent of a normalized path. The root has none.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MediaEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Storage behind the file manager. All paths are normalized virtual paths.
#[async_trait]
pub trait MediaFileSystem: Send + Sync {
    async fn is_dir(&self, path: &str) -> Result<bool, ServiceError>;
    async fn is_file(&self, path: &str) -> Result<bool, ServiceError>;
    /// Immediate children of a directory.
    async fn list(&self, dir: &str) -> Result<Vec<MediaEntry>, ServiceError>;
    async fn create_dir(&self, path: &str) -> Result<(), ServiceError>;
    /// Removes an empty directory.
    async fn remove_dir(&self, path: &str) -> Result<(), ServiceError>;
    async fn remove_file(&self, path: &str) -> Result<(), ServiceError>;
    async fn rename(&self, from: &str, to: &str) -> Result<(), ServiceError>;
    async fn copy_file(&self, from: &str, to: &str) -> Result<(), ServiceError>;
    async fn read(&self, path: &str) -> Result<Vec<u8>, ServiceError>;
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ServiceError>;
}

/// Media storage on the local disk below a root directory.
#[derive(Clone, Debug)]
pub struct LocalMediaFileSystem {
    root: PathBuf,
}

impl LocalMediaFileSystem {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn full(&self, path: &str) -> Result<PathBuf, ServiceError> {
        let normalized = normalize(path)?;
        Ok(self.root.join(normalized.trim_start_matches('/')))
    }
}

#[async_trait]
impl MediaFileSystem for LocalMediaFileSystem {
    async fn is_dir(&self, path: &str) -> Result<bool, ServiceError> {
        Ok(tokio::fs::metadata(self.full(path)?).await.map(|m| m.is_dir()).unwrap_or(false))
    }

    async fn is_file(&self, path: &str) -> Result<bool, ServiceError> {
        Ok(tokio::fs::metadata(self.full(path)?).await.map(|m| m.is_file()).unwrap_or(false))
    }

    async fn list(&self, dir: &str) -> Result<Vec<MediaEntry>, ServiceError> {
        let dir = normalize(dir)?;
        let mut rd = tokio::fs::read_dir(self.full(&dir)?).await?;
        let mut out = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            let meta = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            out.push(MediaEntry {
                path: join(&dir, &name),
                is_dir: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        out.sort_by(|a, b| a.path.to_lowercase().cmp(&b.path.to_lowercase()));
        Ok(out)
    }

    async fn create_dir(&self, path: &str) -> Result<(), ServiceError> {
        Ok(tokio::fs::create_dir(self.full(path)?).await?)
    }

    async fn remove_dir(&self, path: &str) -> Result<(), ServiceError> {
        Ok(tokio::fs::remove_dir(self.full(path)?).await?)
    }

    async fn remove_file(&self, path: &str) -> Result<(), ServiceError> {
        Ok(tokio::fs::remove_file(self.full(path)?).await?)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), ServiceError> {
        Ok(tokio::fs::rename(self.full(from)?, self.full(to)?).await?)
    }

    async fn copy_file(&self, from: &str, to: &str) -> Result<(), ServiceError> {
        tokio::fs::copy(self.full(from)?, self.full(to)?).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        Ok(tokio::fs::read(self.full(path)?).await?)
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ServiceError> {
        Ok(tokio::fs::write(self.full(path)?, bytes).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_virtual_paths() {
        assert_eq!(normalize("").unwrap(), "/");
        assert_eq!(normalize("/Uploaded//images/./").unwrap(), "/Uploaded/images");
        assert_eq!(normalize("a\\b").unwrap(), "/a/b");
        for bad in ["../etc", "/a/../../b", "C:\\Windows", "a/\u{0}b"] {
            assert!(normalize(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn path_helpers() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b.png"), "/a/b.png");
        assert_eq!(parent("/a/b.png"), Some("/a"));
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/"), None);
        assert_eq!(file_name("/a/b.png"), "b.png");
        assert!(validate_name("new folder").is_ok());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
    }

    #[tokio::test]
    async fn local_storage_stays_below_root() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let fs = LocalMediaFileSystem::new(dir.path().join("media")).await?;
        fs.create_dir("/images").await?;
        fs.write("/images/logo.png", b"png").await?;
        assert!(fs.is_file("/images/logo.png").await?);
        assert!(fs.is_dir("images").await?);
        assert_eq!(fs.list("/images").await?[0].size, 3);
        assert!(fs.read("/../outside.txt").await.is_err());
        Ok(())
    }
}
