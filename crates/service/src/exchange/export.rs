use std::path::Path;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use models::export_profile::{self, PROVIDERS};
use models::schedule_task;

use super::task::{TaskScheduler, TaskStore, EXPORT_TASK_TYPE};
use super::{list_dir_files, profile_dir, remove_dir_if_exists, sanitize_file_name, slug};
use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

const KIND: &str = "export";

pub const DEFAULT_FILE_NAME_PATTERN: &str = "%Store.Id%-%Profile.Id%-%Timestamp%";
const PLACEHOLDERS: &[&str] = &["%Store.Id%", "%Profile.Id%", "%Timestamp%"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportProfileInput {
    pub name: String,
    pub provider_system_name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExportProfileUpdate {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub filtering: Option<Value>,
    #[serde(default)]
    pub projection: Option<Value>,
    #[serde(default)]
    pub file_name_pattern: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportProfileDetails {
    #[serde(flatten)]
    pub profile: export_profile::Model,
    pub task: schedule_task::Model,
    pub files: Vec<ExportFile>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub name: String,
    pub size: u64,
}

fn provider(name: &str) -> Result<&'static str, ServiceError> {
    PROVIDERS
        .iter()
        .copied()
        .find(|p| p.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| ServiceError::validation(format!("unknown export provider {name}")))
}

/// Filtering and projection are stored as JSON objects.
fn json_object(field: &str, value: Option<Value>) -> Result<Option<String>, ServiceError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v @ Value::Object(_)) => Ok(Some(v.to_string())),
        Some(_) => Err(ServiceError::validation(format!("{field} must be a JSON object"))),
    }
}

/// Rejects `%...%` tokens that are not known placeholders.
pub fn validate_file_name_pattern(pattern: &str) -> Result<(), ServiceError> {
    let mut rest = pattern;
    while let Some(start) = rest.find('%') {
        let tail = &rest[start + 1..];
        let end = tail
            .find('%')
            .ok_or_else(|| ServiceError::validation("unterminated placeholder in file name pattern"))?;
        let token = &rest[start..start + end + 2];
        if !PLACEHOLDERS.contains(&token) {
            return Err(ServiceError::validation(format!("unknown placeholder {token}")));
        }
        rest = &tail[end + 1..];
    }
    let probe = resolve_file_name(pattern, 0, 0, Utc::now());
    sanitize_file_name(&probe).map(|_| ())
}

/// Expands the placeholders of a file name pattern.
pub fn resolve_file_name(pattern: &str, store_id: i32, profile_id: i32, now: DateTime<Utc>) -> String {
    let pattern = if pattern.trim().is_empty() { DEFAULT_FILE_NAME_PATTERN } else { pattern.trim() };
    pattern
        .replace("%Store.Id%", &store_id.to_string())
        .replace("%Profile.Id%", &profile_id.to_string())
        .replace("%Timestamp%", &now.format("%Y%m%d-%H%M%S").to_string())
}

async fn find(db: &DatabaseConnection, id: i32) -> Result<export_profile::Model, ServiceError> {
    export_profile::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("export profile"))
}

pub async fn list_export_profiles(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<export_profile::Model>, ServiceError> {
    let mut q = export_profile::Entity::find();
    if cmd.sort.is_none() {
        q = q.order_by_asc(export_profile::Column::Name);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_export_profile(db: &DatabaseConnection, data_dir: &Path, id: i32) -> Result<ExportProfileDetails, ServiceError> {
    let profile = find(db, id).await?;
    let task = TaskStore::get(db, profile.schedule_task_id).await?;
    let files = list_export_files(db, data_dir, id).await?;
    Ok(ExportProfileDetails { profile, task, files })
}

#[instrument(skip(db, data_dir))]
pub async fn create_export_profile(db: &DatabaseConnection, data_dir: &Path, input: ExportProfileInput) -> Result<export_profile::Model, ServiceError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("profile name required"));
    }
    let provider = provider(&input.provider_system_name)?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let task = TaskStore::create(&txn, &format!("Export: {name}"), EXPORT_TASK_TYPE).await?;
    let created = export_profile::ActiveModel {
        name: Set(name.clone()),
        folder_name: Set(String::new()),
        provider_system_name: Set(provider.to_string()),
        enabled: Set(false),
        filtering: Set(None),
        projection: Set(None),
        file_name_pattern: Set(Some(DEFAULT_FILE_NAME_PATTERN.to_string())),
        result_info: Set(None),
        schedule_task_id: Set(task.id),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let folder = format!("{}-{}", slug(&name), created.id);
    let mut am: export_profile::ActiveModel = created.into();
    am.folder_name = Set(folder.clone());
    let profile = am.update(&txn).await?;
    tokio::fs::create_dir_all(profile_dir(data_dir, KIND, &folder)).await?;
    txn.commit().await?;
    info!(id = profile.id, provider, "export profile created");
    Ok(profile)
}

pub async fn update_export_profile(db: &DatabaseConnection, id: i32, input: ExportProfileUpdate) -> Result<export_profile::Model, ServiceError> {
    let current = find(db, id).await?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("profile name required"));
    }
    let pattern = input.file_name_pattern.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    if let Some(p) = &pattern {
        validate_file_name_pattern(p)?;
    }
    let filtering = json_object("filtering", input.filtering)?;
    let projection = json_object("projection", input.projection)?;

    let txn = db.begin().await?;
    TaskStore::rename(&txn, current.schedule_task_id, &format!("Export: {name}"), input.enabled).await?;
    let mut am: export_profile::ActiveModel = current.into();
    am.name = Set(name);
    am.enabled = Set(input.enabled);
    am.filtering = Set(filtering);
    am.projection = Set(projection);
    am.file_name_pattern = Set(pattern);
    am.updated_on_utc = Set(Utc::now().into());
    let updated = am.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

pub async fn execute_export(db: &DatabaseConnection, scheduler: &dyn TaskScheduler, id: i32) -> Result<schedule_task::Model, ServiceError> {
    let profile = find(db, id).await?;
    scheduler.run_task(db, profile.schedule_task_id).await
}

pub async fn list_export_files(db: &DatabaseConnection, data_dir: &Path, id: i32) -> Result<Vec<ExportFile>, ServiceError> {
    let profile = find(db, id).await?;
    let files = list_dir_files(&profile_dir(data_dir, KIND, &profile.folder_name)).await?;
    Ok(files.into_iter().map(|(name, size)| ExportFile { name, size }).collect())
}

pub async fn delete_export_file(db: &DatabaseConnection, data_dir: &Path, id: i32, file_name: &str) -> Result<(), ServiceError> {
    let profile = find(db, id).await?;
    let path = profile_dir(data_dir, KIND, &profile.folder_name).join(sanitize_file_name(file_name)?);
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::not_found("export file")),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(db, data_dir))]
pub async fn delete_export_profile(db: &DatabaseConnection, data_dir: &Path, id: i32) -> Result<(), ServiceError> {
    let profile = find(db, id).await?;
    let txn = db.begin().await?;
    export_profile::Entity::delete_by_id(id).exec(&txn).await?;
    TaskStore::delete(&txn, profile.schedule_task_id).await?;
    txn.commit().await?;
    remove_dir_if_exists(&profile_dir(data_dir, KIND, &profile.folder_name)).await?;
    info!(id, "export profile deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    use crate::exchange::task::DbTaskScheduler;
    use crate::test_support::get_db;

    #[test]
    fn file_name_patterns() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(resolve_file_name("%Store.Id%-products-%Profile.Id%", 2, 7, now), "2-products-7");
        assert_eq!(resolve_file_name("", 1, 3, now), "1-3-20240309-140507");
        assert!(validate_file_name_pattern("export-%Timestamp%").is_ok());
        assert!(validate_file_name_pattern("export-%Nope%").is_err());
        assert!(validate_file_name_pattern("export-%Timestamp").is_err());
        assert!(validate_file_name_pattern("../%Profile.Id%").is_err());
    }

    #[tokio::test]
    async fn export_profile_lifecycle() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let dir = tempfile::tempdir()?;
        assert!(create_export_profile(&db, dir.path(), ExportProfileInput { name: "X".into(), provider_system_name: "Pdf".into() }).await.is_err());
        let profile = create_export_profile(&db, dir.path(), ExportProfileInput { name: "Feed".into(), provider_system_name: "productcsv".into() }).await?;
        assert_eq!(profile.provider_system_name, "ProductCsv");

        let bad = ExportProfileUpdate { name: "Feed".into(), filtering: Some(json!([1])), ..Default::default() };
        assert!(update_export_profile(&db, profile.id, bad).await.is_err());
        let update = ExportProfileUpdate {
            name: "Feed".into(),
            enabled: true,
            filtering: Some(json!({"published": true})),
            file_name_pattern: Some("feed-%Profile.Id%".into()),
            ..Default::default()
        };
        let updated = update_export_profile(&db, profile.id, update).await?;
        assert_eq!(updated.filtering.as_deref(), Some(r#"{"published":true}"#));

        let folder = dir.path().join("export").join(&profile.folder_name);
        tokio::fs::write(folder.join("feed-1.csv"), b"a,b").await?;
        assert_eq!(list_export_files(&db, dir.path(), profile.id).await?, vec![ExportFile { name: "feed-1.csv".into(), size: 3 }]);
        assert!(delete_export_file(&db, dir.path(), profile.id, "../feed-1.csv").await.is_err());
        delete_export_file(&db, dir.path(), profile.id, "feed-1.csv").await?;
        assert!(list_export_files(&db, dir.path(), profile.id).await?.is_empty());

        assert!(execute_export(&db, &DbTaskScheduler, profile.id).await?.next_run_utc.is_some());
        delete_export_profile(&db, dir.path(), profile.id).await?;
        assert!(!folder.exists());
        Ok(())
    }
}
