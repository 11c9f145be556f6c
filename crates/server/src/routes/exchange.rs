//! Import and export profiles.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};

use models::{export_profile, import_profile, schedule_task};
use service::exchange::export::{self as exports, ExportFile, ExportProfileDetails, ExportProfileInput, ExportProfileUpdate};
use service::exchange::import::{self as imports, ImportProfileDetails, ImportProfileInput, ImportProfileUpdate, UploadedImportFile};
use service::grid::{GridCommand, GridModel};
use service::notifier::{ActionOutcome, Notifier};

use super::auth::ServerState;
use crate::admin::{audit, outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> JsonApiError {
    JsonApiError::new(StatusCode::BAD_REQUEST, "Invalid upload", Some(e.to_string()))
}

fn task_started(task: schedule_task::Model, what: &str) -> Json<ActionOutcome<schedule_task::Model>> {
    let mut notifier = Notifier::new();
    notifier.info(format!("{what} has been scheduled"));
    Json(ActionOutcome::ok(task, notifier))
}

// import

pub async fn list_import_profiles(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<import_profile::Model>> {
    Ok(Json(imports::list_import_profiles(&state.db, &cmd).await?))
}

pub async fn get_import_profile(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<ImportProfileDetails> {
    Ok(Json(imports::get_import_profile(&state.db, &state.exchange_dir, id).await?))
}

pub async fn create_import_profile(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<ImportProfileInput>) -> ApiResult<ActionOutcome<import_profile::Model>> {
    let created = imports::create_import_profile(&state.db, &state.exchange_dir, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "ImportProfile", "import", Action::Create, id, created).await)
}

pub async fn update_import_profile(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<ImportProfileUpdate>) -> ApiResult<ActionOutcome<import_profile::Model>> {
    let updated = imports::update_import_profile(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "ImportProfile", "import", Action::Update, id, updated).await)
}

pub async fn delete_import_profile(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    imports::delete_import_profile(&state.db, &state.exchange_dir, id).await?;
    Ok(outcome(&state, &admin, "ImportProfile", "import", Action::Delete, id, ()).await)
}

/// Accepts one or more `file` parts; every part with a file name is stored.
#[utoipa::path(post, path = "/admin/import/{id}/files", tag = "exchange", params(("id" = i32, Path, description = "Import profile")),
    responses((status = 200, description = "Stored files with their source columns"), (status = 400, description = "Validation Error")))]
pub async fn upload_import_file(
    State(state): State<ServerState>,
    admin: CurrentAdmin,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> ApiResult<Vec<UploadedImportFile>> {
    let mut stored = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.file_name().map(str::to_string) else { continue };
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        stored.push(imports::upload_import_file(&state.db, &state.exchange_dir, id, &name, &bytes).await?);
    }
    if stored.is_empty() {
        return Err(JsonApiError::new(StatusCode::BAD_REQUEST, "Invalid upload", Some("no file was sent".into())));
    }
    audit(&state, &admin, "ImportProfile", Action::Update, id, &format!("{} import files uploaded", stored.len())).await;
    Ok(Json(stored))
}

pub async fn delete_import_file(State(state): State<ServerState>, admin: CurrentAdmin, Path((id, name)): Path<(i32, String)>) -> ApiResult<()> {
    imports::delete_import_file(&state.db, &state.exchange_dir, id, &name).await?;
    audit(&state, &admin, "ImportProfile", Action::Update, id, &format!("import file {name} deleted")).await;
    Ok(Json(()))
}

pub async fn execute_import(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<schedule_task::Model>> {
    let task = imports::execute_import(&state.db, state.scheduler.as_ref(), &state.exchange_dir, id).await?;
    audit(&state, &admin, "ImportProfile", Action::Update, id, "import started").await;
    Ok(task_started(task, "Import"))
}

// export

pub async fn list_export_profiles(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<export_profile::Model>> {
    Ok(Json(exports::list_export_profiles(&state.db, &cmd).await?))
}

pub async fn get_export_profile(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<ExportProfileDetails> {
    Ok(Json(exports::get_export_profile(&state.db, &state.exchange_dir, id).await?))
}

pub async fn create_export_profile(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<ExportProfileInput>) -> ApiResult<ActionOutcome<export_profile::Model>> {
    let created = exports::create_export_profile(&state.db, &state.exchange_dir, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "ExportProfile", "export", Action::Create, id, created).await)
}

pub async fn update_export_profile(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<ExportProfileUpdate>) -> ApiResult<ActionOutcome<export_profile::Model>> {
    let updated = exports::update_export_profile(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "ExportProfile", "export", Action::Update, id, updated).await)
}

pub async fn delete_export_profile(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    exports::delete_export_profile(&state.db, &state.exchange_dir, id).await?;
    Ok(outcome(&state, &admin, "ExportProfile", "export", Action::Delete, id, ()).await)
}

pub async fn execute_export(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<schedule_task::Model>> {
    let task = exports::execute_export(&state.db, state.scheduler.as_ref(), id).await?;
    audit(&state, &admin, "ExportProfile", Action::Update, id, "export started").await;
    Ok(task_started(task, "Export"))
}

pub async fn list_export_files(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Vec<ExportFile>> {
    Ok(Json(exports::list_export_files(&state.db, &state.exchange_dir, id).await?))
}

pub async fn delete_export_file(State(state): State<ServerState>, admin: CurrentAdmin, Path((id, name)): Path<(i32, String)>) -> ApiResult<()> {
    exports::delete_export_file(&state.db, &state.exchange_dir, id, &name).await?;
    audit(&state, &admin, "ExportProfile", Action::Update, id, &format!("export file {name} deleted")).await;
    Ok(Json(()))
}
