//! Categories, manufacturers, products and attribute definitions.

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;

use models::{category, manufacturer, product, product_attribute, product_attribute_option, specification_attribute, specification_attribute_option};
use service::catalog::category::{self as categories, CategoryDetails, CategoryInput, CategoryNode};
use service::catalog::manufacturer::{self as manufacturers, ManufacturerDetails, ManufacturerInput};
use service::catalog::product::{self as products, ProductDetails, ProductInput};
use service::catalog::product_attribute::{self as product_attrs, AttributeOptionInput, ProductAttributeDetails, ProductAttributeInput};
use service::catalog::spec_attribute::{self as spec_attrs, SpecAttributeDetails, SpecAttributeInput, SpecOptionInput};
use service::catalog::tree::{DropPlan, DropPosition};
use service::grid::{GridCommand, GridModel};
use service::notifier::ActionOutcome;

use super::auth::ServerState;
use crate::admin::{outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DropRequest {
    pub target_id: i32,
    #[schema(value_type = String)]
    pub position: DropPosition,
}

#[derive(Debug, Deserialize)]
pub struct OrderEntry {
    pub id: i32,
    pub display_order: i32,
}

// categories

#[utoipa::path(get, path = "/admin/categories", tag = "catalog", responses((status = 200, description = "Category grid")))]
pub async fn list_categories(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<category::Model>> {
    Ok(Json(categories::list_categories(&state.db, &cmd).await?))
}

pub async fn category_tree(State(state): State<ServerState>) -> ApiResult<Vec<CategoryNode>> {
    Ok(Json(categories::category_tree(&state.db).await?))
}

pub async fn get_category(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<CategoryDetails> {
    Ok(Json(categories::get_category(&state.db, id).await?))
}

#[utoipa::path(post, path = "/admin/categories", tag = "catalog", responses((status = 200, description = "Created"), (status = 400, description = "Validation Error")))]
pub async fn create_category(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<CategoryInput>) -> ApiResult<ActionOutcome<CategoryDetails>> {
    let created = categories::create_category(&state.db, input).await?;
    let id = created.category.id;
    Ok(outcome(&state, &admin, "Category", "category", Action::Create, id, created).await)
}

pub async fn update_category(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<CategoryInput>) -> ApiResult<ActionOutcome<CategoryDetails>> {
    let updated = categories::update_category(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Category", "category", Action::Update, id, updated).await)
}

pub async fn delete_category(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    categories::delete_category(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Category", "category", Action::Delete, id, ()).await)
}

#[utoipa::path(post, path = "/admin/categories/{id}/move", tag = "catalog", request_body = DropRequest, params(("id" = i32, Path, description = "Dragged category")), responses((status = 200, description = "New parent and display orders"), (status = 400, description = "Cycle or invalid target")))]
pub async fn move_category(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(req): Json<DropRequest>) -> ApiResult<DropPlan> {
    let plan = categories::tree_drop(&state.db, id, req.target_id, req.position).await?;
    crate::admin::audit(&state, &admin, "Category", Action::Update, id, "category moved").await;
    Ok(Json(plan))
}

// manufacturers

pub async fn list_manufacturers(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<manufacturer::Model>> {
    Ok(Json(manufacturers::list_manufacturers(&state.db, &cmd).await?))
}

pub async fn get_manufacturer(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<ManufacturerDetails> {
    Ok(Json(manufacturers::get_manufacturer(&state.db, id).await?))
}

pub async fn create_manufacturer(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<ManufacturerInput>) -> ApiResult<ActionOutcome<ManufacturerDetails>> {
    let created = manufacturers::create_manufacturer(&state.db, input).await?;
    let id = created.manufacturer.id;
    Ok(outcome(&state, &admin, "Manufacturer", "manufacturer", Action::Create, id, created).await)
}

pub async fn update_manufacturer(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<ManufacturerInput>) -> ApiResult<ActionOutcome<ManufacturerDetails>> {
    let updated = manufacturers::update_manufacturer(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Manufacturer", "manufacturer", Action::Update, id, updated).await)
}

pub async fn delete_manufacturer(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    manufacturers::delete_manufacturer(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Manufacturer", "manufacturer", Action::Delete, id, ()).await)
}

// products

pub async fn list_products(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<product::Model>> {
    Ok(Json(products::list_products(&state.db, &cmd).await?))
}

pub async fn get_product(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<ProductDetails> {
    Ok(Json(products::get_product(&state.db, id).await?))
}

pub async fn create_product(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<ProductInput>) -> ApiResult<ActionOutcome<ProductDetails>> {
    let created = products::create_product(&state.db, input).await?;
    let id = created.product.id;
    Ok(outcome(&state, &admin, "Product", "product", Action::Create, id, created).await)
}

pub async fn update_product(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<ProductInput>) -> ApiResult<ActionOutcome<ProductDetails>> {
    let updated = products::update_product(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "Product", "product", Action::Update, id, updated).await)
}

pub async fn delete_product(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    products::delete_product(&state.db, id).await?;
    Ok(outcome(&state, &admin, "Product", "product", Action::Delete, id, ()).await)
}

// specification attributes

pub async fn list_spec_attributes(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<specification_attribute::Model>> {
    Ok(Json(spec_attrs::list_attributes(&state.db, &cmd).await?))
}

pub async fn get_spec_attribute(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<SpecAttributeDetails> {
    Ok(Json(spec_attrs::get_attribute(&state.db, id).await?))
}

pub async fn create_spec_attribute(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<SpecAttributeInput>) -> ApiResult<ActionOutcome<SpecAttributeDetails>> {
    let created = spec_attrs::create_attribute(&state.db, input).await?;
    let id = created.attribute.id;
    Ok(outcome(&state, &admin, "SpecificationAttribute", "specificationattribute", Action::Create, id, created).await)
}

pub async fn update_spec_attribute(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<SpecAttributeInput>) -> ApiResult<ActionOutcome<SpecAttributeDetails>> {
    let updated = spec_attrs::update_attribute(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "SpecificationAttribute", "specificationattribute", Action::Update, id, updated).await)
}

pub async fn delete_spec_attribute(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    spec_attrs::delete_attribute(&state.db, id).await?;
    Ok(outcome(&state, &admin, "SpecificationAttribute", "specificationattribute", Action::Delete, id, ()).await)
}

pub async fn list_spec_options(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Vec<specification_attribute_option::Model>> {
    Ok(Json(spec_attrs::list_options(&state.db, id).await?))
}

pub async fn create_spec_option(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<SpecOptionInput>) -> ApiResult<specification_attribute_option::Model> {
    let created = spec_attrs::create_option(&state.db, id, input).await?;
    crate::admin::audit(&state, &admin, "SpecificationAttributeOption", Action::Create, created.id, &created.name).await;
    Ok(Json(created))
}

pub async fn update_spec_option(State(state): State<ServerState>, admin: CurrentAdmin, Path(option_id): Path<i32>, Json(input): Json<SpecOptionInput>) -> ApiResult<specification_attribute_option::Model> {
    let updated = spec_attrs::update_option(&state.db, option_id, input).await?;
    crate::admin::audit(&state, &admin, "SpecificationAttributeOption", Action::Update, option_id, &updated.name).await;
    Ok(Json(updated))
}

pub async fn delete_spec_option(State(state): State<ServerState>, admin: CurrentAdmin, Path(option_id): Path<i32>) -> ApiResult<()> {
    spec_attrs::delete_option(&state.db, option_id).await?;
    crate::admin::audit(&state, &admin, "SpecificationAttributeOption", Action::Delete, option_id, "option deleted").await;
    Ok(Json(()))
}

pub async fn order_spec_options(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(orders): Json<Vec<OrderEntry>>) -> ApiResult<usize> {
    let pairs: Vec<(i32, i32)> = orders.iter().map(|o| (o.id, o.display_order)).collect();
    let changed = spec_attrs::set_option_orders(&state.db, id, &pairs).await?;
    crate::admin::audit(&state, &admin, "SpecificationAttribute", Action::Update, id, "option order changed").await;
    Ok(Json(changed))
}

// product attributes

pub async fn list_product_attributes(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<product_attribute::Model>> {
    Ok(Json(product_attrs::list_attributes(&state.db, &cmd).await?))
}

pub async fn get_product_attribute(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<ProductAttributeDetails> {
    Ok(Json(product_attrs::get_attribute(&state.db, id).await?))
}

pub async fn create_product_attribute(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<ProductAttributeInput>) -> ApiResult<ActionOutcome<ProductAttributeDetails>> {
    let created = product_attrs::create_attribute(&state.db, input).await?;
    let id = created.attribute.id;
    Ok(outcome(&state, &admin, "ProductAttribute", "productattribute", Action::Create, id, created).await)
}

pub async fn update_product_attribute(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<ProductAttributeInput>) -> ApiResult<ActionOutcome<ProductAttributeDetails>> {
    let updated = product_attrs::update_attribute(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, "ProductAttribute", "productattribute", Action::Update, id, updated).await)
}

pub async fn delete_product_attribute(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    product_attrs::delete_attribute(&state.db, id).await?;
    Ok(outcome(&state, &admin, "ProductAttribute", "productattribute", Action::Delete, id, ()).await)
}

pub async fn list_product_attribute_options(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Vec<product_attribute_option::Model>> {
    Ok(Json(product_attrs::list_options(&state.db, id).await?))
}

pub async fn create_product_attribute_option(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<AttributeOptionInput>) -> ApiResult<product_attribute_option::Model> {
    let created = product_attrs::create_option(&state.db, id, input).await?;
    crate::admin::audit(&state, &admin, "ProductAttributeOption", Action::Create, created.id, &created.name).await;
    Ok(Json(created))
}

pub async fn update_product_attribute_option(State(state): State<ServerState>, admin: CurrentAdmin, Path(option_id): Path<i32>, Json(input): Json<AttributeOptionInput>) -> ApiResult<product_attribute_option::Model> {
    let updated = product_attrs::update_option(&state.db, option_id, input).await?;
    crate::admin::audit(&state, &admin, "ProductAttributeOption", Action::Update, option_id, &updated.name).await;
    Ok(Json(updated))
}

pub async fn delete_product_attribute_option(State(state): State<ServerState>, admin: CurrentAdmin, Path(option_id): Path<i32>) -> ApiResult<()> {
    product_attrs::delete_option(&state.db, option_id).await?;
    crate::admin::audit(&state, &admin, "ProductAttributeOption", Action::Delete, option_id, "option deleted").await;
    Ok(Json(()))
}
