//! Menus, topics, message templates and theme variables.

use std::collections::{BTreeMap, HashMap};

use axum::{extract::{Path, Query, State}, Json};

use models::{menu, menu_item, message_template, topic};
use service::catalog::tree::DropPlan;
use service::cms::menu::{self as menus, MenuDetails, MenuInput, MenuItemInput, MenuItemNode};
use service::cms::message_template::{self as templates, MessageTemplateDetails, MessageTemplateInput, TemplatePreview};
use service::cms::theme;
use service::cms::topic::{self as topics, TopicDetails, TopicInput};
use service::grid::{GridCommand, GridModel};
use service::notifier::{ActionOutcome, Notifier};

use super::auth::ServerState;
use super::catalog::DropRequest;
use crate::admin::{audit, outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

// menus

pub async fn list_menus(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<menu::Model>> {
    Ok(Json(menus::list_menus(&state.db, &cmd).await?))
}

pub async fn get_menu(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<MenuDetails> {
    Ok(Json(menus::get_menu(&state.db, id).await?))
}

pub async fn create_menu(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<MenuInput>) -> ApiResult<ActionOutcome<MenuDetails>> {
    let created = menus::create_menu(&state.db, input).await?;
    let id = created.menu.id;
    Ok(outcome(&state, &admin, menu::ENTITY_NAME, "menu", Action::Create, id, created).await)
}

pub async fn update_menu(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<MenuInput>) -> ApiResult<ActionOutcome<MenuDetails>> {
    let updated = menus::update_menu(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, menu::ENTITY_NAME, "menu", Action::Update, id, updated).await)
}

pub async fn delete_menu(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    menus::delete_menu(&state.db, id).await?;
    Ok(outcome(&state, &admin, menu::ENTITY_NAME, "menu", Action::Delete, id, ()).await)
}

pub async fn list_menu_items(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Vec<menu_item::Model>> {
    Ok(Json(menus::list_items(&state.db, id).await?))
}

pub async fn menu_tree(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Vec<MenuItemNode>> {
    Ok(Json(menus::menu_tree(&state.db, id).await?))
}

pub async fn get_menu_item(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<menu_item::Model> {
    Ok(Json(menus::get_item(&state.db, id).await?))
}

pub async fn create_menu_item(State(state): State<ServerState>, admin: CurrentAdmin, Path(menu_id): Path<i32>, Json(input): Json<MenuItemInput>) -> ApiResult<ActionOutcome<menu_item::Model>> {
    let created = menus::create_item(&state.db, menu_id, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, menu_item::ENTITY_NAME, "menuitem", Action::Create, id, created).await)
}

pub async fn update_menu_item(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<MenuItemInput>) -> ApiResult<ActionOutcome<menu_item::Model>> {
    let updated = menus::update_item(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, menu_item::ENTITY_NAME, "menuitem", Action::Update, id, updated).await)
}

/// Deletes the item with its descendants; the payload is the number of removed items.
pub async fn delete_menu_item(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<u64>> {
    let removed = menus::delete_item(&state.db, id).await?;
    Ok(outcome(&state, &admin, menu_item::ENTITY_NAME, "menuitem", Action::Delete, id, removed).await)
}

pub async fn move_menu_item(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(req): Json<DropRequest>) -> ApiResult<DropPlan> {
    let plan = menus::move_item(&state.db, id, req.target_id, req.position).await?;
    audit(&state, &admin, menu_item::ENTITY_NAME, Action::Update, id, "menu item moved").await;
    Ok(Json(plan))
}

// topics

pub async fn list_topics(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<topic::Model>> {
    Ok(Json(topics::list_topics(&state.db, &cmd).await?))
}

pub async fn get_topic(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<TopicDetails> {
    Ok(Json(topics::get_topic(&state.db, id).await?))
}

pub async fn create_topic(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<TopicInput>) -> ApiResult<ActionOutcome<TopicDetails>> {
    let created = topics::create_topic(&state.db, input).await?;
    let id = created.topic.id;
    Ok(outcome(&state, &admin, topic::ENTITY_NAME, "topic", Action::Create, id, created).await)
}

pub async fn update_topic(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<TopicInput>) -> ApiResult<ActionOutcome<TopicDetails>> {
    let updated = topics::update_topic(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, topic::ENTITY_NAME, "topic", Action::Update, id, updated).await)
}

pub async fn delete_topic(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    topics::delete_topic(&state.db, id).await?;
    Ok(outcome(&state, &admin, topic::ENTITY_NAME, "topic", Action::Delete, id, ()).await)
}

// message templates

pub async fn list_templates(State(state): State<ServerState>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<message_template::Model>> {
    Ok(Json(templates::list_templates(&state.db, &cmd).await?))
}

pub async fn get_template(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<MessageTemplateDetails> {
    Ok(Json(templates::get_template(&state.db, id).await?))
}

pub async fn create_template(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<MessageTemplateInput>) -> ApiResult<ActionOutcome<MessageTemplateDetails>> {
    let created = templates::create_template(&state.db, input).await?;
    let id = created.template.id;
    Ok(outcome(&state, &admin, message_template::ENTITY_NAME, "messagetemplate", Action::Create, id, created).await)
}

pub async fn update_template(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<MessageTemplateInput>) -> ApiResult<ActionOutcome<MessageTemplateDetails>> {
    let updated = templates::update_template(&state.db, id, input).await?;
    Ok(outcome(&state, &admin, message_template::ENTITY_NAME, "messagetemplate", Action::Update, id, updated).await)
}

pub async fn delete_template(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<()>> {
    templates::delete_template(&state.db, id).await?;
    Ok(outcome(&state, &admin, message_template::ENTITY_NAME, "messagetemplate", Action::Delete, id, ()).await)
}

pub async fn copy_template(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<MessageTemplateDetails>> {
    let copy = templates::copy_template(&state.db, id).await?;
    let copy_id = copy.template.id;
    Ok(outcome(&state, &admin, message_template::ENTITY_NAME, "messagetemplate", Action::Create, copy_id, copy).await)
}

pub async fn preview_template(State(state): State<ServerState>, Path(id): Path<i32>, Json(tokens): Json<HashMap<String, String>>) -> ApiResult<TemplatePreview> {
    Ok(Json(templates::preview(&state.db, id, &tokens).await?))
}

// theme variables

pub async fn get_theme_variables(State(state): State<ServerState>, Path((theme_name, store_id)): Path<(String, i32)>) -> ApiResult<BTreeMap<String, String>> {
    Ok(Json(theme::get_variables(&state.db, &theme_name, store_id).await?))
}

pub async fn save_theme_variables(
    State(state): State<ServerState>,
    admin: CurrentAdmin,
    Path((theme_name, store_id)): Path<(String, i32)>,
    Json(values): Json<HashMap<String, String>>,
) -> ApiResult<ActionOutcome<BTreeMap<String, String>>> {
    let saved = theme::save_variables(&state.db, &theme_name, store_id, &values).await?;
    audit(&state, &admin, "ThemeVariable", Action::Update, store_id, &format!("{saved} variables of {theme_name} saved")).await;
    let current = theme::get_variables(&state.db, &theme_name, store_id).await?;
    let mut notifier = Notifier::new();
    notifier.success(format!("{saved} theme variables saved"));
    Ok(Json(ActionOutcome::ok(current, notifier)))
}

pub async fn reset_theme_variables(State(state): State<ServerState>, admin: CurrentAdmin, Path((theme_name, store_id)): Path<(String, i32)>) -> ApiResult<u64> {
    let removed = theme::reset_variables(&state.db, &theme_name, store_id).await?;
    audit(&state, &admin, "ThemeVariable", Action::Delete, store_id, &format!("{theme_name} variables reset")).await;
    Ok(Json(removed))
}
