//! Discounts and their rule set assignments.

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;

use models::discount;
use service::discount::{self as discounts, DiscountDetails, DiscountInput};
use service::grid::{GridCommand, GridModel};
use service::notifier::ActionOutcome;

use super::auth::ServerState;
use crate::admin::{outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RuleSetAssignment {
    pub rule_set_ids: Vec<i32>,
}

#[utoipa::path(get, path = "/admin/discounts", tag = "promotions", responses((status = 200, description = "Discount grid")))]
pub async fn list_discounts(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<discount::Model>> {
    Ok(Json(discounts::list_discounts(&state.db, &cmd).await?))
}

pub async fn get_discount(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<DiscountDetails> {
    Ok(Json(discounts::get_discount(&state.db, id).await?))
}

pub async fn create_discount(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<DiscountInput>) -> ApiResult<ActionOutcome<DiscountDetails>> {
    let created = discounts::create_discount(&state.db, input).await?;
    let id = created.discount.id;
    Ok(outcome(&state, &admin, "Discount", "discount", Action::Create, id, created).await)
}

pub async fn update_discount(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<DiscountInput>) -> ApiResult<ActionOutcome<DiscountDetails>> {
    let updated = discounts::update_discount(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Discount", "discount", Action::Update, id, updated).await)
}

pub async fn delete_discount(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    discounts::delete_discount(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Discount", "discount", Action::Delete, id, ()).await)
}

#[utoipa::path(put, path = "/admin/discounts/{id}/rule-sets", tag = "promotions", request_body = RuleSetAssignment, params(("id" = i32, Path, description = "Discount")),
    responses((status = 200, description = "Assigned rule set ids"), (status = 404, description = "Not Found")))]
pub async fn set_rule_sets(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(body): Json<RuleSetAssignment>) -> ApiResult<ActionOutcome<Vec<i32>>> {
    let ids = discounts::set_rule_sets(&state.db, id, &body.rule_set_ids).await?;
    Ok(outcome(&state, &admin, "Discount", "discount", Action::Update, id, ids).await)
}
