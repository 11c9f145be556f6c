//! Orders, shipments, return requests and recurring payments.

use axum::{extract::{Path, Query, State}, Json};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use models::order::ShippingStatus;
use models::return_request::ReturnRequestStatus;
use models::{order, recurring_payment, return_request, shipment};
use service::grid::{GridCommand, GridModel};
use service::notifier::ActionOutcome;
use service::sales::order::{self as orders, OrderFilter, OrderInput};
use service::sales::recurring_payment::{self as recurring, RecurringPaymentDetails, RecurringPaymentInput, RecurringPaymentUpdate};
use service::sales::return_request::{self as returns, ReturnRequestInput, ReturnRequestUpdate};
use service::sales::shipment::{self as shipments, ShipmentChange, ShipmentFilter, ShipmentInput};

use super::auth::ServerState;
use crate::admin::{audit, outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct TrackingRequest {
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// Body of the shipped/delivered transitions. A missing date means now.
#[derive(Debug, Default, Deserialize)]
pub struct DateRequest {
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnFilter {
    #[serde(default)]
    pub status: Option<ReturnRequestStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub order_id: Option<i32>,
}

// orders

#[utoipa::path(get, path = "/admin/orders", tag = "sales", responses((status = 200, description = "Order grid")))]
pub async fn list_orders(
    State(state): State<ServerState>,
    Query(filter): Query<OrderFilter>,
    Query(cmd): Query<GridCommand>,
) -> ApiResult<GridModel<order::Model>> {
    Ok(Json(orders::list_orders(&state.db, &filter, &cmd).await?))
}

pub async fn get_order(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<order::Model> {
    Ok(Json(orders::get_order(&state.db, id).await?))
}

pub async fn create_order(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<OrderInput>) -> ApiResult<ActionOutcome<order::Model>> {
    let created = orders::create_order(&state.db, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "Order", "order", Action::Create, id, created).await)
}

// shipments

pub async fn list_shipments(
    State(state): State<ServerState>,
    Query(filter): Query<ShipmentFilter>,
    Query(cmd): Query<GridCommand>,
) -> ApiResult<GridModel<shipment::Model>> {
    Ok(Json(shipments::list_shipments(&state.db, &filter, &cmd).await?))
}

pub async fn get_shipment(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<shipment::Model> {
    Ok(Json(shipments::get_shipment(&state.db, id).await?))
}

pub async fn create_shipment(
    State(state): State<ServerState>,
    admin: CurrentAdmin,
    Path(order_id): Path<i32>,
    Json(input): Json<ShipmentInput>,
) -> ApiResult<ActionOutcome<ShipmentChange>> {
    let change = shipments::create_shipment(&state.db, order_id, input).await?;
    let id = change.shipment.id;
    Ok(outcome(&state, &admin, "Shipment", "shipment", Action::Create, id, change).await)
}

pub async fn update_tracking(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(req): Json<TrackingRequest>) -> ApiResult<ActionOutcome<ShipmentChange>> {
    let change = shipments::update_tracking_number(&state.db, id, req.tracking_number).await?;
    Ok(outcome(&state, &admin, "Shipment", "shipment", Action::Update, id, change).await)
}

pub async fn set_shipped(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(req): Json<DateRequest>) -> ApiResult<ActionOutcome<ShipmentChange>> {
    let change = shipments::set_shipped(&state.db, id, req.date).await?;
    Ok(outcome(&state, &admin, "Shipment", "shipment", Action::Update, id, change).await)
}

pub async fn set_delivered(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(req): Json<DateRequest>) -> ApiResult<ActionOutcome<ShipmentChange>> {
    let change = shipments::set_delivered(&state.db, id, req.date).await?;
    Ok(outcome(&state, &admin, "Shipment", "shipment", Action::Update, id, change).await)
}

/// The payload is the owning order's recomputed shipping status.
pub async fn delete_shipment(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<ShippingStatus>> {
    let status = shipments::delete_shipment(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Shipment", "shipment", Action::Delete, id, status).await)
}

// return requests

pub async fn list_return_requests(
    State(state): State<ServerState>,
    Query(filter): Query<ReturnFilter>,
    Query(cmd): Query<GridCommand>,
) -> ApiResult<GridModel<return_request::Model>> {
    Ok(Json(returns::list_return_requests(&state.db, filter.status, &cmd).await?))
}

pub async fn get_return_request(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<return_request::Model> {
    Ok(Json(returns::get_return_request(&state.db, id).await?))
}

pub async fn create_return_request(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<ReturnRequestInput>) -> ApiResult<ActionOutcome<return_request::Model>> {
    let created = returns::create_return_request(&state.db, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "ReturnRequest", "returnrequest", Action::Create, id, created).await)
}

pub async fn update_return_request(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<ReturnRequestUpdate>) -> ApiResult<ActionOutcome<return_request::Model>> {
    let updated = returns::update_return_request(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "ReturnRequest", "returnrequest", Action::Update, id, updated).await)
}

pub async fn delete_return_request(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    returns::delete_return_request(&state.db, id).await?;
    Ok(outcome(&state, &admin, "ReturnRequest", "returnrequest", Action::Delete, id, ()).await)
}

// recurring payments

pub async fn list_recurring_payments(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<recurring_payment::Model>> {
    Ok(Json(recurring::list_recurring_payments(&state.db, &cmd).await?))
}

pub async fn get_recurring_payment(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<RecurringPaymentDetails> {
    Ok(Json(recurring::get_recurring_payment(&state.db, id).await?))
}

pub async fn create_recurring_payment(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<RecurringPaymentInput>) -> ApiResult<ActionOutcome<RecurringPaymentDetails>> {
    let created = recurring::create_recurring_payment(&state.db, input).await?;
    let id = created.payment.id;
    Ok(outcome(&state, &admin, "RecurringPayment", "recurringpayment", Action::Create, id, created).await)
}

pub async fn update_recurring_payment(
    State(state): State<ServerState>,
    admin: CurrentAdmin,
    Path(id): Path<i32>,
    Json(input): Json<RecurringPaymentUpdate>,
) -> ApiResult<ActionOutcome<RecurringPaymentDetails>> {
    let updated = recurring::update_recurring_payment(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "RecurringPayment", "recurringpayment", Action::Update, id, updated).await)
}

pub async fn delete_recurring_payment(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    recurring::delete_recurring_payment(&state.db, id).await?;
    Ok(outcome(&state, &admin, "RecurringPayment", "recurringpayment", Action::Delete, id, ()).await)
}

pub async fn process_recurring_payment(
    State(state): State<ServerState>,
    admin: CurrentAdmin,
    Path(id): Path<i32>,
    Json(req): Json<ProcessRequest>,
) -> ApiResult<RecurringPaymentDetails> {
    let details = recurring::process_next_payment(&state.db, id, req.order_id).await?;
    audit(&state, &admin, "RecurringPayment", Action::Update, id, "next payment processed").await;
    Ok(Json(details))
}

pub async fn cancel_recurring_payment(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<RecurringPaymentDetails> {
    let details = recurring::cancel(&state.db, id).await?;
    audit(&state, &admin, "RecurringPayment", Action::Update, id, "recurring payment cancelled").await;
    Ok(Json(details))
}
