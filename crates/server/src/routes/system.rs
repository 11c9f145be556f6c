//! Stores, languages and the activity log.

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;

use models::{activity_log, language, store};
use service::activity;
use service::grid::{GridCommand, GridModel};
use service::localization::{self as languages, LanguageInput};
use service::notifier::ActionOutcome;
use service::store::{self as stores, StoreInput};

use super::auth::ServerState;
use crate::admin::{outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityFilter {
    #[serde(default)]
    pub activity_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PruneQuery {
    pub days: i64,
}

pub async fn list_stores(State(state): State<ServerState>) -> ApiResult<Vec<store::Model>> {
    Ok(Json(stores::list_stores(&state.db).await?))
}

pub async fn get_store(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<store::Model> {
    Ok(Json(stores::get_store(&state.db, id).await?))
}

pub async fn create_store(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<StoreInput>) -> ApiResult<ActionOutcome<store::Model>> {
    let created = stores::create_store(&state.db, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "Store", "store", Action::Create, id, created).await)
}

pub async fn update_store(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<StoreInput>) -> ApiResult<ActionOutcome<store::Model>> {
    let updated = stores::update_store(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Store", "store", Action::Update, id, updated).await)
}

pub async fn delete_store(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    stores::delete_store(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Store", "store", Action::Delete, id, ()).await)
}

pub async fn list_languages(State(state): State<ServerState>) -> ApiResult<Vec<language::Model>> {
    Ok(Json(languages::list_languages(&state.db).await?))
}

pub async fn create_language(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<LanguageInput>) -> ApiResult<ActionOutcome<language::Model>> {
    let created = languages::create_language(&state.db, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "Language", "language", Action::Create, id, created).await)
}

pub async fn update_language(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<LanguageInput>) -> ApiResult<ActionOutcome<language::Model>> {
    let updated = languages::update_language(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Language", "language", Action::Update, id, updated).await)
}

pub async fn delete_language(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    languages::delete_language(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Language", "language", Action::Delete, id, ()).await)
}

pub async fn list_activity(
    State(state): State<ServerState>,
    Query(filter): Query<ActivityFilter>,
    Query(cmd): Query<GridCommand>,
) -> ApiResult<GridModel<activity_log::Model>> {
    Ok(Json(activity::list_activity(&state.db, filter.activity_type.as_deref(), &cmd).await?))
}

pub async fn prune_activity(State(state): State<ServerState>, _admin: CurrentAdmin, Query(q): Query<PruneQuery>) -> ApiResult<u64> {
    Ok(Json(activity::delete_older_than(&state.db, q.days).await?))
}
