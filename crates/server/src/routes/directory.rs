//! Countries and currencies.

use std::collections::HashMap;

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;

use models::{country, currency};
use service::directory::country::{self as countries, CountryInput};
use service::directory::currency::{self as currencies, CurrencyInput};
use service::grid::{GridCommand, GridModel};
use service::notifier::ActionOutcome;

use super::auth::ServerState;
use crate::admin::{audit, outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub ids: Vec<i32>,
    pub published: bool,
}

pub async fn list_countries(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<country::Model>> {
    Ok(Json(countries::list_countries(&state.db, &cmd).await?))
}

pub async fn get_country(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<country::Model> {
    Ok(Json(countries::get_country(&state.db, id).await?))
}

pub async fn create_country(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<CountryInput>) -> ApiResult<ActionOutcome<country::Model>> {
    let created = countries::create_country(&state.db, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "Country", "country", Action::Create, id, created).await)
}

pub async fn update_country(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<CountryInput>) -> ApiResult<ActionOutcome<country::Model>> {
    let updated = countries::update_country(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Country", "country", Action::Update, id, updated).await)
}

pub async fn delete_country(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    countries::delete_country(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Country", "country", Action::Delete, id, ()).await)
}

pub async fn publish_countries(State(state): State<ServerState>, admin: CurrentAdmin, Json(req): Json<PublishRequest>) -> ApiResult<u64> {
    let changed = countries::set_published(&state.db, &req.ids, req.published).await?;
    for id in &req.ids {
        audit(&state, &admin, "Country", Action::Update, *id, if req.published { "published" } else { "unpublished" }).await;
    }
    Ok(Json(changed))
}

pub async fn list_currencies(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<currency::Model>> {
    Ok(Json(currencies::list_currencies(&state.db, &cmd).await?))
}

pub async fn get_currency(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<currency::Model> {
    Ok(Json(currencies::get_currency(&state.db, id).await?))
}

pub async fn create_currency(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<CurrencyInput>) -> ApiResult<ActionOutcome<currency::Model>> {
    let created = currencies::create_currency(&state.db, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "Currency", "currency", Action::Create, id, created).await)
}

pub async fn update_currency(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<CurrencyInput>) -> ApiResult<ActionOutcome<currency::Model>> {
    let updated = currencies::update_currency(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Currency", "currency", Action::Update, id, updated).await)
}

pub async fn delete_currency(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    currencies::delete_currency(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Currency", "currency", Action::Delete, id, ()).await)
}

/// Body maps currency codes to their new rates.
pub async fn apply_rates(State(state): State<ServerState>, _admin: CurrentAdmin, Json(rates): Json<HashMap<String, f64>>) -> ApiResult<usize> {
    Ok(Json(currencies::apply_rates(&state.db, &rates).await?))
}
