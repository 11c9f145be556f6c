//! Customers and customer roles.

use axum::{extract::{Path, Query, State}, Json};

use models::{customer, customer_role};
use service::customer::{self as customers, CustomerDetails, CustomerInput, CustomerUpdate, RoleInput};
use service::grid::{GridCommand, GridModel};
use service::notifier::ActionOutcome;

use super::auth::ServerState;
use crate::admin::{outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

pub async fn list_customers(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<customer::Model>> {
    Ok(Json(customers::list_customers(&state.db, &cmd).await?))
}

pub async fn get_customer(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<CustomerDetails> {
    Ok(Json(customers::get_customer(&state.db, id).await?))
}

pub async fn create_customer(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<CustomerInput>) -> ApiResult<ActionOutcome<CustomerDetails>> {
    let created = customers::create_customer(&state.db, input).await?;
    let id = created.customer.id;
    Ok(outcome(&state, &admin, "Customer", "customer", Action::Create, id, created).await)
}

pub async fn update_customer(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<CustomerUpdate>) -> ApiResult<ActionOutcome<CustomerDetails>> {
    let updated = customers::update_customer(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Customer", "customer", Action::Update, id, updated).await)
}

/// Customers are deactivated, never removed.
pub async fn delete_customer(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    customers::deactivate_customer(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Customer", "customer", Action::Delete, id, ()).await)
}

pub async fn list_roles(State(state): State<ServerState>) -> ApiResult<Vec<customer_role::Model>> {
    Ok(Json(customers::list_roles(&state.db).await?))
}

pub async fn create_role(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<RoleInput>) -> ApiResult<ActionOutcome<customer_role::Model>> {
    let created = customers::create_role(&state.db, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "CustomerRole", "customerrole", Action::Create, id, created).await)
}

pub async fn update_role(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<RoleInput>) -> ApiResult<ActionOutcome<customer_role::Model>> {
    let updated = customers::update_role(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "CustomerRole", "customerrole", Action::Update, id, updated).await)
}

pub async fn delete_role(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    customers::delete_role(&state.db, id).await?;
    Ok(outcome(&state, &admin, "CustomerRole", "customerrole", Action::Delete, id, ()).await)
}
