//! Roxy Fileman actions over a [`MediaFileSystem`].

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::fs::{file_name, join, normalize, parent, validate_name, MediaFileSystem};
use crate::errors::ServiceError;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoxyAction {
    DirList,
    FilesList,
    CreateDir,
    DeleteDir,
    MoveDir,
    CopyDir,
    RenameDir,
    DeleteFile,
    MoveFile,
    CopyFile,
    RenameFile,
    Upload,
    Download,
}

impl FromStr for RoxyAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "DIRLIST" => Self::DirList,
            "FILESLIST" => Self::FilesList,
            "CREATEDIR" => Self::CreateDir,
            "DELETEDIR" => Self::DeleteDir,
            "MOVEDIR" => Self::MoveDir,
            "COPYDIR" => Self::CopyDir,
            "RENAMEDIR" => Self::RenameDir,
            "DELETEFILE" => Self::DeleteFile,
            "MOVEFILE" => Self::MoveFile,
            "COPYFILE" => Self::CopyFile,
            "RENAMEFILE" => Self::RenameFile,
            "UPLOAD" => Self::Upload,
            "DOWNLOAD" => Self::Download,
            other => return Err(ServiceError::validation(format!("unknown file manager action {other}"))),
        })
    }
}

/// Form fields of a request: `d` directory, `f` file, `n` new name or target, `type` filter.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoxyParams {
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub f: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoxyStatus {
    pub res: &'static str,
    pub msg: String,
}

impl RoxyStatus {
    pub fn ok() -> Self { Self { res: "ok", msg: String::new() } }
    pub fn error(msg: impl Into<String>) -> Self { Self { res: "error", msg: msg.into() } }
    pub fn is_ok(&self) -> bool { self.res == "ok" }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoxyDir {
    pub p: String,
    pub f: usize,
    pub d: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoxyFile {
    pub p: String,
    pub s: u64,
    pub t: i64,
    pub w: u32,
    pub h: u32,
}

pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, PartialEq)]
pub enum RoxyOutput {
    Status(RoxyStatus),
    Dirs(Vec<RoxyDir>),
    Files(Vec<RoxyFile>),
    Download { name: String, bytes: Vec<u8> },
}

#[derive(Clone)]
pub struct FileManager {
    fs: Arc<dyn MediaFileSystem>,
    max_upload_bytes: u64,
    allowed_extensions: Vec<String>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ServiceError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::validation(format!("missing parameter {field}")))
}

fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i + 1 < name.len() => &name[i + 1..],
        _ => "",
    }
}

impl FileManager {
    pub fn new(fs: Arc<dyn MediaFileSystem>, cfg: &configs::MediaConfig) -> Self {
        Self { fs, max_upload_bytes: cfg.max_upload_bytes, allowed_extensions: cfg.allowed_extensions.clone() }
    }

    /// Runs one action. Failures become `{"res":"error"}` payloads.
    pub async fn handle(&self, action: RoxyAction, params: &RoxyParams, uploads: Vec<UploadedFile>) -> RoxyOutput {
        match self.dispatch(action, params, uploads).await {
            Ok(out) => out,
            Err(e) => {
                warn!(?action, error = %e, "file manager action failed");
                RoxyOutput::Status(RoxyStatus::error(e.to_string()))
            }
        }
    }

    async fn dispatch(&self, action: RoxyAction, p: &RoxyParams, uploads: Vec<UploadedFile>) -> Result<RoxyOutput, ServiceError> {
        let ok = || Ok(RoxyOutput::Status(RoxyStatus::ok()));
        match action {
            RoxyAction::DirList => Ok(RoxyOutput::Dirs(self.dir_list().await?)),
            RoxyAction::FilesList => {
                let dir = self.existing_dir(p.d.as_deref().unwrap_or("/")).await?;
                let images_only = p.kind.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("image"));
                Ok(RoxyOutput::Files(self.files_list(&dir, images_only).await?))
            }
            RoxyAction::CreateDir => {
                let dir = self.existing_dir(required(&p.d, "d")?).await?;
                let target = join(&dir, validate_name(required(&p.n, "n")?)?);
                self.ensure_free(&target).await?;
                self.fs.create_dir(&target).await?;
                info!(path = %target, "media dir created");
                ok()
            }
            RoxyAction::DeleteDir => {
                let dir = self.movable_dir(required(&p.d, "d")?).await?;
                if !self.fs.list(&dir).await?.is_empty() {
                    return Err(ServiceError::conflict(format!("{dir} is not empty")));
                }
                self.fs.remove_dir(&dir).await?;
                info!(path = %dir, "media dir deleted");
                ok()
            }
            RoxyAction::MoveDir | RoxyAction::CopyDir => {
                let source = self.movable_dir(required(&p.d, "d")?).await?;
                let target_parent = self.existing_dir(required(&p.n, "n")?).await?;
                if target_parent == source || target_parent.starts_with(&format!("{source}/")) {
                    return Err(ServiceError::validation("a directory cannot be placed inside itself"));
                }
                let target = join(&target_parent, file_name(&source));
                self.ensure_free(&target).await?;
                if action == RoxyAction::MoveDir {
                    self.fs.rename(&source, &target).await?;
                } else {
                    self.copy_tree(&source, &target).await?;
                }
                ok()
            }
            RoxyAction::RenameDir => {
                let dir = self.movable_dir(required(&p.d, "d")?).await?;
                let parent_dir = parent(&dir).unwrap_or("/");
                let target = join(parent_dir, validate_name(required(&p.n, "n")?)?);
                if target != dir {
                    self.ensure_free(&target).await?;
                    self.fs.rename(&dir, &target).await?;
                }
                ok()
            }
            RoxyAction::DeleteFile => {
                let file = self.existing_file(required(&p.f, "f")?).await?;
                self.fs.remove_file(&file).await?;
                info!(path = %file, "media file deleted");
                ok()
            }
            RoxyAction::MoveFile => {
                let file = self.existing_file(required(&p.f, "f")?).await?;
                let target = normalize(required(&p.n, "n")?)?;
                self.existing_dir(parent(&target).unwrap_or("/")).await?;
                self.check_extension(file_name(&target))?;
                if target != file {
                    self.ensure_free(&target).await?;
                    self.fs.rename(&file, &target).await?;
                }
                ok()
            }
            RoxyAction::CopyFile => {
                let file = self.existing_file(required(&p.f, "f")?).await?;
                let dir = self.existing_dir(required(&p.d, "d")?).await?;
                let target = self.free_name(&dir, file_name(&file)).await?;
                self.fs.copy_file(&file, &target).await?;
                ok()
            }
            RoxyAction::RenameFile => {
                let file = self.existing_file(required(&p.f, "f")?).await?;
                let name = validate_name(required(&p.n, "n")?)?;
                self.check_extension(name)?;
                let target = join(parent(&file).unwrap_or("/"), name);
                if target != file {
                    self.ensure_free(&target).await?;
                    self.fs.rename(&file, &target).await?;
                }
                ok()
            }
            RoxyAction::Upload => {
                let dir = self.existing_dir(required(&p.d, "d")?).await?;
                if uploads.is_empty() {
                    return Err(ServiceError::validation("no files uploaded"));
                }
                for upload in &uploads {
                    let name = validate_name(file_name(&upload.name.replace('\\', "/")))?.to_string();
                    self.check_extension(&name)?;
                    if upload.bytes.len() as u64 > self.max_upload_bytes {
                        return Err(ServiceError::validation(format!("{name} exceeds the upload limit of {} bytes", self.max_upload_bytes)));
                    }
                }
                for upload in uploads {
                    let name = file_name(&upload.name.replace('\\', "/")).trim().to_string();
                    let target = self.free_name(&dir, &name).await?;
                    self.fs.write(&target, &upload.bytes).await?;
                    info!(path = %target, size = upload.bytes.len(), "media file uploaded");
                }
                ok()
            }
            RoxyAction::Download => {
                let file = self.existing_file(required(&p.f, "f")?).await?;
                let bytes = self.fs.read(&file).await?;
                Ok(RoxyOutput::Download { name: file_name(&file).to_string(), bytes })
            }
        }
    }

    async fn existing_dir(&self, path: &str) -> Result<String, ServiceError> {
        let dir = normalize(path)?;
        if !self.fs.is_dir(&dir).await? {
            return Err(ServiceError::not_found(&format!("directory {dir}")));
        }
        Ok(dir)
    }

    /// An existing directory other than the root.
    async fn movable_dir(&self, path: &str) -> Result<String, ServiceError> {
        let dir = self.existing_dir(path).await?;
        if dir == "/" {
            return Err(ServiceError::validation("the root directory cannot be changed"));
        }
        Ok(dir)
    }

    async fn existing_file(&self, path: &str) -> Result<String, ServiceError> {
        let file = normalize(path)?;
        if !self.fs.is_file(&file).await? {
            return Err(ServiceError::not_found(&format!("file {file}")));
        }
        Ok(file)
    }

    async fn ensure_free(&self, path: &str) -> Result<(), ServiceError> {
        if self.fs.is_dir(path).await? || self.fs.is_file(path).await? {
            return Err(ServiceError::conflict(format!("{path} already exists")));
        }
        Ok(())
    }

    /// `name`, or `name(1).ext`, `name(2).ext`... when taken.
    async fn free_name(&self, dir: &str, name: &str) -> Result<String, ServiceError> {
        let candidate = join(dir, name);
        if !self.fs.is_file(&candidate).await? {
            return Ok(candidate);
        }
        let ext = extension(name);
        let stem = if ext.is_empty() { name } else { &name[..name.len() - ext.len() - 1] };
        for i in 1.. {
            let next = if ext.is_empty() { format!("{stem}({i})") } else { format!("{stem}({i}).{ext}") };
            let candidate = join(dir, &next);
            if !self.fs.is_file(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(ServiceError::conflict(format!("no free name for {name}")))
    }

    fn check_extension(&self, name: &str) -> Result<(), ServiceError> {
        let ext = extension(name);
        if ext.is_empty() || !self.allowed_extensions.iter().any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext)) {
            return Err(ServiceError::validation(format!("file type of {name} is not allowed")));
        }
        Ok(())
    }

    /// Every directory from the root down, with file and subdirectory counts.
    async fn dir_list(&self) -> Result<Vec<RoxyDir>, ServiceError> {
        let mut out = Vec::new();
        let mut stack = vec!["/".to_string()];
        while let Some(dir) = stack.pop() {
            let entries = self.fs.list(&dir).await?;
            let subdirs: Vec<String> = entries.iter().filter(|e| e.is_dir).map(|e| e.path.clone()).collect();
            out.push(RoxyDir { p: dir, f: entries.len() - subdirs.len(), d: subdirs.len() });
            stack.extend(subdirs.into_iter().rev());
        }
        Ok(out)
    }

    async fn files_list(&self, dir: &str, images_only: bool) -> Result<Vec<RoxyFile>, ServiceError> {
        Ok(self
            .fs
            .list(dir)
            .await?
            .into_iter()
            .filter(|e| !e.is_dir)
            .filter(|e| !images_only || IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(extension(&e.path))))
            .map(|e| RoxyFile { t: e.modified.map(|m| m.timestamp()).unwrap_or(0), p: e.path, s: e.size, w: 0, h: 0 })
            .collect())
    }

    async fn copy_tree(&self, source: &str, target: &str) -> Result<(), ServiceError> {
        let mut stack = vec![(source.to_string(), target.to_string())];
        while let Some((from, to)) = stack.pop() {
            self.fs.create_dir(&to).await?;
            for entry in self.fs.list(&from).await? {
                let dest = join(&to, file_name(&entry.path));
                if entry.is_dir {
                    stack.push((entry.path, dest));
                } else {
                    self.fs.copy_file(&entry.path, &dest).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fs::LocalMediaFileSystem;

    async fn manager(root: &std::path::Path) -> FileManager {
        let fs = LocalMediaFileSystem::new(root).await.unwrap();
        let cfg = configs::MediaConfig {
            root: root.display().to_string(),
            max_upload_bytes: 8,
            allowed_extensions: vec!["png".into(), "txt".into()],
        };
        FileManager::new(Arc::new(fs), &cfg)
    }

    fn params(d: Option<&str>, f: Option<&str>, n: Option<&str>) -> RoxyParams {
        RoxyParams { d: d.map(Into::into), f: f.map(Into::into), n: n.map(Into::into), kind: None }
    }

    fn is_ok(out: &RoxyOutput) -> bool {
        matches!(out, RoxyOutput::Status(s) if s.is_ok())
    }

    #[test]
    fn parses_actions() {
        assert_eq!("dirlist".parse::<RoxyAction>().unwrap(), RoxyAction::DirList);
        assert_eq!("RENAMEFILE".parse::<RoxyAction>().unwrap(), RoxyAction::RenameFile);
        assert!("FORMAT".parse::<RoxyAction>().is_err());
    }

    #[tokio::test]
    async fn directory_actions() {
        let tmp = tempfile::tempdir().unwrap();
        let fm = manager(tmp.path()).await;
        assert!(is_ok(&fm.handle(RoxyAction::CreateDir, &params(Some("/"), None, Some("images")), vec![]).await));
        assert!(is_ok(&fm.handle(RoxyAction::CreateDir, &params(Some("/images"), None, Some("icons")), vec![]).await));
        assert!(!is_ok(&fm.handle(RoxyAction::CreateDir, &params(Some("/"), None, Some("images")), vec![]).await));
        assert!(!is_ok(&fm.handle(RoxyAction::CreateDir, &params(Some("/../"), None, Some("x")), vec![]).await));

        let RoxyOutput::Dirs(dirs) = fm.handle(RoxyAction::DirList, &RoxyParams::default(), vec![]).await else { panic!("dirs") };
        assert_eq!(dirs[0], RoxyDir { p: "/".into(), f: 0, d: 1 });
        assert_eq!(dirs.iter().map(|d| d.p.as_str()).collect::<Vec<_>>(), vec!["/", "/images", "/images/icons"]);

        assert!(!is_ok(&fm.handle(RoxyAction::DeleteDir, &params(Some("/"), None, None), vec![]).await));
        assert!(!is_ok(&fm.handle(RoxyAction::RenameDir, &params(Some("/"), None, Some("x")), vec![]).await));
        assert!(!is_ok(&fm.handle(RoxyAction::DeleteDir, &params(Some("/images"), None, None), vec![]).await));
        assert!(!is_ok(&fm.handle(RoxyAction::MoveDir, &params(Some("/images"), None, Some("/images/icons")), vec![]).await));

        assert!(is_ok(&fm.handle(RoxyAction::CopyDir, &params(Some("/images/icons"), None, Some("/")), vec![]).await));
        assert!(is_ok(&fm.handle(RoxyAction::RenameDir, &params(Some("/icons"), None, Some("logos")), vec![]).await));
        assert!(is_ok(&fm.handle(RoxyAction::DeleteDir, &params(Some("/logos"), None, None), vec![]).await));
    }

    #[tokio::test]
    async fn file_actions() {
        let tmp = tempfile::tempdir().unwrap();
        let fm = manager(tmp.path()).await;
        fm.handle(RoxyAction::CreateDir, &params(Some("/"), None, Some("docs")), vec![]).await;
        let upload = |name: &str, bytes: &[u8]| vec![UploadedFile { name: name.into(), bytes: bytes.to_vec() }];

        assert!(!is_ok(&fm.handle(RoxyAction::Upload, &params(Some("/docs"), None, None), upload("run.exe", b"x")).await));
        assert!(!is_ok(&fm.handle(RoxyAction::Upload, &params(Some("/docs"), None, None), upload("big.txt", b"123456789")).await));
        assert!(is_ok(&fm.handle(RoxyAction::Upload, &params(Some("/docs"), None, None), upload("C:\\tmp\\a.txt", b"hi")).await));
        assert!(is_ok(&fm.handle(RoxyAction::Upload, &params(Some("/docs"), None, None), upload("a.txt", b"again")).await));

        let RoxyOutput::Files(files) = fm.handle(RoxyAction::FilesList, &params(Some("/docs"), None, None), vec![]).await else { panic!("files") };
        assert_eq!(files.iter().map(|f| f.p.as_str()).collect::<Vec<_>>(), vec!["/docs/a(1).txt", "/docs/a.txt"]);
        assert_eq!(files[1].s, 2);

        let mut images = params(Some("/docs"), None, None);
        images.kind = Some("image".into());
        assert!(matches!(fm.handle(RoxyAction::FilesList, &images, vec![]).await, RoxyOutput::Files(f) if f.is_empty()));

        assert!(!is_ok(&fm.handle(RoxyAction::RenameFile, &params(None, Some("/docs/a.txt"), Some("a.exe")), vec![]).await));
        assert!(is_ok(&fm.handle(RoxyAction::RenameFile, &params(None, Some("/docs/a.txt"), Some("b.txt")), vec![]).await));
        assert!(is_ok(&fm.handle(RoxyAction::CopyFile, &params(Some("/"), Some("/docs/b.txt"), None), vec![]).await));
        assert!(is_ok(&fm.handle(RoxyAction::MoveFile, &params(None, Some("/b.txt"), Some("/docs/c.txt")), vec![]).await));
        assert!(!is_ok(&fm.handle(RoxyAction::DeleteDir, &params(Some("/docs"), None, None), vec![]).await));

        let out = fm.handle(RoxyAction::Download, &params(None, Some("/docs/c.txt"), None), vec![]).await;
        assert_eq!(out, RoxyOutput::Download { name: "c.txt".into(), bytes: b"hi".to_vec() });
        assert!(is_ok(&fm.handle(RoxyAction::DeleteFile, &params(None, Some("/docs/c.txt"), None), vec![]).await));
        assert!(!is_ok(&fm.handle(RoxyAction::Download, &params(None, Some("/../etc/passwd"), None), vec![]).await));
    }
}
