use std::path::Path;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use models::import_profile::{self, ImportEntityType, ImportFileType};
use models::schedule_task;

use super::column_map::ColumnMap;
use super::task::{TaskScheduler, TaskStore, IMPORT_TASK_TYPE};
use super::{list_dir_files, profile_dir, remove_dir_if_exists, sanitize_file_name, slug};
use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

const KIND: &str = "import";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportProfileInput {
    pub name: String,
    pub entity_type: ImportEntityType,
    pub file_type: ImportFileType,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImportProfileUpdate {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub skip: i32,
    #[serde(default)]
    pub take: i32,
    #[serde(default)]
    pub key_field_names: Vec<String>,
    #[serde(default)]
    pub column_mapping: ColumnMap,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportProfileDetails {
    #[serde(flatten)]
    pub profile: import_profile::Model,
    pub task: schedule_task::Model,
    pub key_fields: Vec<String>,
    pub columns: ColumnMap,
    pub files: Vec<String>,
}

/// Stored file plus the source columns found in its header row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedImportFile {
    pub file_name: String,
    pub size: u64,
    pub columns: Vec<String>,
}

fn split_keys(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Key fields identify existing rows on import and must be entity properties.
pub fn validate_key_fields(entity: ImportEntityType, keys: &[String]) -> Result<Vec<String>, ServiceError> {
    let known = entity.properties();
    let mut out: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
        let canonical = known
            .iter()
            .find(|p| p.eq_ignore_ascii_case(key))
            .ok_or_else(|| ServiceError::validation(format!("{key} is not a key field of {entity:?}")))?;
        if !out.iter().any(|k| k.as_str() == *canonical) {
            out.push(canonical.to_string());
        }
    }
    Ok(out)
}

/// Header row of a CSV file.
pub fn csv_headers(bytes: &[u8]) -> Result<Vec<String>, ServiceError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| ServiceError::validation(format!("unreadable csv header: {e}")))?;
    Ok(headers.iter().map(|h| h.trim().trim_start_matches('\u{feff}').to_string()).filter(|h| !h.is_empty()).collect())
}

async fn find(db: &DatabaseConnection, id: i32) -> Result<import_profile::Model, ServiceError> {
    import_profile::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("import profile"))
}

pub async fn list_import_profiles(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<import_profile::Model>, ServiceError> {
    let mut q = import_profile::Entity::find();
    if cmd.sort.is_none() {
        q = q.order_by_asc(import_profile::Column::Name);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_import_profile(db: &DatabaseConnection, data_dir: &Path, id: i32) -> Result<ImportProfileDetails, ServiceError> {
    let profile = find(db, id).await?;
    let task = TaskStore::get(db, profile.schedule_task_id).await?;
    let files = list_dir_files(&profile_dir(data_dir, KIND, &profile.folder_name)).await?;
    Ok(ImportProfileDetails {
        key_fields: split_keys(profile.key_field_names.as_deref()),
        columns: ColumnMap::from_json(profile.column_mapping.as_deref())?,
        files: files.into_iter().map(|(name, _)| name).collect(),
        task,
        profile,
    })
}

/// Creates the profile, its disabled task and its staging folder.
#[instrument(skip(db, data_dir))]
pub async fn create_import_profile(db: &DatabaseConnection, data_dir: &Path, input: ImportProfileInput) -> Result<import_profile::Model, ServiceError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("profile name required"));
    }
    let now = Utc::now();
    let txn = db.begin().await?;
    let task = TaskStore::create(&txn, &format!("Import: {name}"), IMPORT_TASK_TYPE).await?;
    let created = import_profile::ActiveModel {
        name: Set(name.clone()),
        folder_name: Set(String::new()),
        file_type: Set(input.file_type),
        entity_type: Set(input.entity_type),
        enabled: Set(false),
        skip: Set(0),
        take: Set(0),
        key_field_names: Set(None),
        column_mapping: Set(None),
        result_info: Set(None),
        schedule_task_id: Set(task.id),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let folder = format!("{}-{}", slug(&name), created.id);
    let mut am: import_profile::ActiveModel = created.into();
    am.folder_name = Set(folder.clone());
    let profile = am.update(&txn).await?;
    tokio::fs::create_dir_all(profile_dir(data_dir, KIND, &folder)).await?;
    txn.commit().await?;
    info!(id = profile.id, folder = %folder, "import profile created");
    Ok(profile)
}

pub async fn update_import_profile(db: &DatabaseConnection, id: i32, input: ImportProfileUpdate) -> Result<import_profile::Model, ServiceError> {
    let current = find(db, id).await?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("profile name required"));
    }
    if input.skip < 0 || input.take < 0 {
        return Err(ServiceError::validation("skip and take cannot be negative"));
    }
    let keys = validate_key_fields(current.entity_type, &input.key_field_names)?;
    let mut columns = input.column_mapping;
    columns.validate(current.entity_type)?;

    let txn = db.begin().await?;
    TaskStore::rename(&txn, current.schedule_task_id, &format!("Import: {name}"), input.enabled).await?;
    let mut am: import_profile::ActiveModel = current.into();
    am.name = Set(name);
    am.enabled = Set(input.enabled);
    am.skip = Set(input.skip);
    am.take = Set(input.take);
    am.key_field_names = Set(if keys.is_empty() { None } else { Some(keys.join(",")) });
    am.column_mapping = Set(columns.to_json());
    am.updated_on_utc = Set(Utc::now().into());
    let updated = am.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Stores an import file in the staging folder. CSV headers are returned as source columns.
#[instrument(skip(db, data_dir, bytes), fields(len = bytes.len()))]
pub async fn upload_import_file(
    db: &DatabaseConnection,
    data_dir: &Path,
    id: i32,
    file_name: &str,
    bytes: &[u8],
) -> Result<UploadedImportFile, ServiceError> {
    let profile = find(db, id).await?;
    let file_name = sanitize_file_name(file_name)?;
    let expected = profile.file_type.extension();
    let ext = Path::new(&file_name).extension().and_then(|e| e.to_str()).unwrap_or_default();
    if !ext.eq_ignore_ascii_case(expected) {
        return Err(ServiceError::validation(format!("{file_name} is not a .{expected} file")));
    }
    if bytes.is_empty() {
        return Err(ServiceError::validation("uploaded file is empty"));
    }
    let columns = match profile.file_type {
        ImportFileType::Csv => csv_headers(bytes)?,
        ImportFileType::Xlsx => Vec::new(),
    };
    let dir = profile_dir(data_dir, KIND, &profile.folder_name);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(&file_name), bytes).await?;
    info!(id, file = %file_name, columns = columns.len(), "import file stored");
    Ok(UploadedImportFile { file_name, size: bytes.len() as u64, columns })
}

pub async fn delete_import_file(db: &DatabaseConnection, data_dir: &Path, id: i32, file_name: &str) -> Result<(), ServiceError> {
    let profile = find(db, id).await?;
    let path = profile_dir(data_dir, KIND, &profile.folder_name).join(sanitize_file_name(file_name)?);
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::not_found("import file")),
        Err(e) => Err(e.into()),
    }
}

/// Enqueues the profile's task. Requires at least one staged file.
pub async fn execute_import(
    db: &DatabaseConnection,
    scheduler: &dyn TaskScheduler,
    data_dir: &Path,
    id: i32,
) -> Result<schedule_task::Model, ServiceError> {
    let profile = find(db, id).await?;
    if list_dir_files(&profile_dir(data_dir, KIND, &profile.folder_name)).await?.is_empty() {
        return Err(ServiceError::validation("upload an import file first"));
    }
    scheduler.run_task(db, profile.schedule_task_id).await
}

#[instrument(skip(db, data_dir))]
pub async fn delete_import_profile(db: &DatabaseConnection, data_dir: &Path, id: i32) -> Result<(), ServiceError> {
    let profile = find(db, id).await?;
    let txn = db.begin().await?;
    import_profile::Entity::delete_by_id(id).exec(&txn).await?;
    TaskStore::delete(&txn, profile.schedule_task_id).await?;
    txn.commit().await?;
    remove_dir_if_exists(&profile_dir(data_dir, KIND, &profile.folder_name)).await?;
    info!(id, "import profile deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::task::DbTaskScheduler;
    use crate::test_support::get_db;

    #[test]
    fn key_fields_are_checked() {
        let keys = validate_key_fields(ImportEntityType::Product, &["sku".into(), " Id ".into(), "SKU".into()]).unwrap();
        assert_eq!(keys, vec!["Sku", "Id"]);
        assert!(validate_key_fields(ImportEntityType::Category, &["Sku".into()]).is_err());
    }

    #[test]
    fn reads_csv_header() {
        let headers = csv_headers(b"\xef\xbb\xbfSku,Name , Price\nA1,Pen,2\n").unwrap();
        assert_eq!(headers, vec!["Sku", "Name", "Price"]);
    }

    #[tokio::test]
    async fn import_profile_lifecycle() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let dir = tempfile::tempdir()?;
        let input = ImportProfileInput { name: "Spring Products".into(), entity_type: ImportEntityType::Product, file_type: ImportFileType::Csv };
        let profile = create_import_profile(&db, dir.path(), input).await?;
        assert_eq!(profile.folder_name, format!("spring-products-{}", profile.id));
        let staging = dir.path().join("import").join(&profile.folder_name);
        assert!(staging.is_dir());

        assert!(execute_import(&db, &DbTaskScheduler, dir.path(), profile.id).await.is_err());
        assert!(upload_import_file(&db, dir.path(), profile.id, "products.xlsx", b"x").await.is_err());
        let uploaded = upload_import_file(&db, dir.path(), profile.id, "products.csv", b"Sku,Title\nA1,Pen\n").await?;
        assert_eq!(uploaded.columns, vec!["Sku", "Title"]);

        let mut columns = ColumnMap::new();
        columns.add("Title", "Name", None);
        let update = ImportProfileUpdate {
            name: "Spring Products".into(),
            enabled: true,
            take: 100,
            key_field_names: vec!["sku".into()],
            column_mapping: columns,
            ..Default::default()
        };
        update_import_profile(&db, profile.id, update).await?;
        let details = get_import_profile(&db, dir.path(), profile.id).await?;
        assert_eq!(details.key_fields, vec!["Sku"]);
        assert_eq!(details.columns.property_for("Title"), Some("Name"));
        assert_eq!(details.files, vec!["products.csv"]);
        assert!(details.task.enabled);

        let task = execute_import(&db, &DbTaskScheduler, dir.path(), profile.id).await?;
        assert!(task.next_run_utc.is_some());

        delete_import_profile(&db, dir.path(), profile.id).await?;
        assert!(!staging.exists());
        assert!(TaskStore::get(&db, profile.schedule_task_id).await.is_err());
        Ok(())
    }
}
