//! Import and export profiles with their staging folders and scheduled tasks.

pub mod column_map;
pub mod export;
pub mod import;
pub mod task;

use std::path::{Path, PathBuf};

use crate::errors::ServiceError;

/// Lower-case slug used for profile folder names.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() { "profile".to_string() } else { trimmed.to_string() }
}

/// Single file name inside a profile folder. Separators, `..` and hidden names are rejected.
pub fn sanitize_file_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(|c| c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
    {
        return Err(ServiceError::validation(format!("invalid file name: {name}")));
    }
    Ok(name.to_string())
}

pub(crate) fn profile_dir(data_dir: &Path, kind: &str, folder_name: &str) -> PathBuf {
    data_dir.join(kind).join(folder_name)
}

/// File names in a folder, sorted. A missing folder lists as empty.
pub(crate) async fn list_dir_files(dir: &Path) -> Result<Vec<(String, u64)>, ServiceError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if meta.is_file() {
            files.push((entry.file_name().to_string_lossy().into_owned(), meta.len()));
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) async fn remove_dir_if_exists(dir: &Path) -> Result<(), ServiceError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slug("  Spring Products / 2024 "), "spring-products-2024");
        assert_eq!(slug("***"), "profile");
    }

    #[test]
    fn file_names() {
        assert_eq!(sanitize_file_name(" products.csv ").unwrap(), "products.csv");
        for bad in ["", "../x.csv", "a/b.csv", "a\\b", ".hidden", "x?.csv"] {
            assert!(sanitize_file_name(bad).is_err(), "{bad}");
        }
    }
}
