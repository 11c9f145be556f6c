//! Rule sets, their rules and the metadata the rule editor needs.

use axum::{extract::{Path, Query, State}, Json};
use serde::{Deserialize, Serialize};

use common::types::SelectOption;
use models::rule;
use models::rule_set::{self, LogicalOperator, RuleScope};
use service::errors::ServiceError;
use service::grid::{GridCommand, GridModel};
use service::notifier::ActionOutcome;
use service::rules::descriptor::{self, DataSource, RuleDescriptor};
use service::rules::facts::CartFacts;
use service::rules::options::{self, RemoteOptions};
use service::rules::service::{self as rule_sets, GroupCreated, RuleInput, RuleSetDetails, RuleSetInput, RuleSetUpdate, RuleUpdate};

use super::auth::ServerState;
use crate::admin::{audit, outcome, Action, CurrentAdmin};
use crate::errors::JsonApiError;

type ApiResult<T> = Result<Json<T>, JsonApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct ScopeFilter {
    #[serde(default)]
    pub scope: Option<RuleScope>,
}

#[derive(Debug, Deserialize)]
pub struct OperatorRequest {
    pub operator: LogicalOperator,
}

#[derive(Debug, Default, Deserialize)]
pub struct OptionsQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u64>,
    /// Comma separated ids to resolve instead of paging.
    #[serde(default)]
    pub ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CartTestResult {
    pub matched: bool,
}

fn parse_ids(raw: &str) -> Result<Vec<i32>, ServiceError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| ServiceError::validation(format!("invalid id {s}"))))
        .collect()
}

#[utoipa::path(get, path = "/admin/rules", tag = "rules", responses((status = 200, description = "Rule set grid")))]
pub async fn list_rule_sets(
    State(state): State<ServerState>,
    Query(filter): Query<ScopeFilter>,
    Query(cmd): Query<GridCommand>,
) -> ApiResult<GridModel<rule_set::Model>> {
    Ok(Json(rule_sets::list_rule_sets(&state.db, filter.scope, &cmd).await?))
}

pub async fn get_rule_set(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<RuleSetDetails> {
    Ok(Json(rule_sets::get_rule_set(&state.db, id).await?))
}

pub async fn create_rule_set(State(state): State<ServerState>, admin: CurrentAdmin, Json(input): Json<RuleSetInput>) -> ApiResult<ActionOutcome<rule_set::Model>> {
    let created = rule_sets::create_rule_set(&state.db, input).await?;
    let id = created.id;
    Ok(outcome(&state, &admin, "RuleSet", "rules", Action::Create, id, created).await)
}

pub async fn update_rule_set(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<RuleSetUpdate>) -> ApiResult<ActionOutcome<rule_set::Model>> {
    let updated = rule_sets::update_rule_set(&state.db, &state.rules, id, input).await?;
    Ok(outcome(&state, &admin, "RuleSet", "rules", Action::Update, id, updated).await)
}

/// The payload is the number of rule sets removed, sub-groups included.
pub async fn delete_rule_set(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<ActionOutcome<usize>> {
    let removed = rule_sets::delete_rule_set(&state.db, &state.rules, id).await?;
    Ok(outcome(&state, &admin, "RuleSet", "rules", Action::Delete, id, removed).await)
}

pub async fn add_rule(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(input): Json<RuleInput>) -> ApiResult<rule::Model> {
    let created = rule_sets::add_rule(&state.db, &state.rules, id, input).await?;
    audit(&state, &admin, "Rule", Action::Create, created.id, &format!("rule {} added", created.rule_type)).await;
    Ok(Json(created))
}

pub async fn update_rules(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(updates): Json<Vec<RuleUpdate>>) -> ApiResult<Vec<rule::Model>> {
    let updated = rule_sets::update_rules(&state.db, &state.rules, id, updates).await?;
    audit(&state, &admin, "RuleSet", Action::Update, id, &format!("{} rules updated", updated.len())).await;
    Ok(Json(updated))
}

pub async fn delete_rule(State(state): State<ServerState>, admin: CurrentAdmin, Path(rule_id): Path<i32>) -> ApiResult<()> {
    rule_sets::delete_rule(&state.db, &state.rules, rule_id).await?;
    audit(&state, &admin, "Rule", Action::Delete, rule_id, "rule deleted").await;
    Ok(Json(()))
}

pub async fn add_group(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>) -> ApiResult<GroupCreated> {
    let created = rule_sets::add_group(&state.db, &state.rules, id).await?;
    audit(&state, &admin, "RuleSet", Action::Create, created.rule_set.id, "rule group added").await;
    Ok(Json(created))
}

pub async fn delete_group(State(state): State<ServerState>, admin: CurrentAdmin, Path(rule_id): Path<i32>) -> ApiResult<()> {
    rule_sets::delete_group(&state.db, &state.rules, rule_id).await?;
    audit(&state, &admin, "Rule", Action::Delete, rule_id, "rule group deleted").await;
    Ok(Json(()))
}

pub async fn change_operator(State(state): State<ServerState>, admin: CurrentAdmin, Path(id): Path<i32>, Json(req): Json<OperatorRequest>) -> ApiResult<rule_set::Model> {
    let updated = rule_sets::change_operator(&state.db, &state.rules, id, req.operator).await?;
    audit(&state, &admin, "RuleSet", Action::Update, id, "logical operator changed").await;
    Ok(Json(updated))
}

/// Ids of the customers or products the rule set currently matches.
pub async fn preview(State(state): State<ServerState>, Path(id): Path<i32>, Query(cmd): Query<GridCommand>) -> ApiResult<GridModel<i32>> {
    Ok(Json(rule_sets::preview(&state.db, &state.rules, id, &cmd).await?))
}

pub async fn test_cart(State(state): State<ServerState>, Path(id): Path<i32>, Json(cart): Json<CartFacts>) -> ApiResult<CartTestResult> {
    let matched = rule_sets::test_cart(&state.db, &state.rules, id, &cart).await?;
    Ok(Json(CartTestResult { matched }))
}

pub async fn descriptors(Path(scope): Path<RuleScope>) -> Json<Vec<RuleDescriptor>> {
    Json(descriptor::descriptors(scope))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OptionsResponse {
    Page(RemoteOptions),
    Selected(Vec<SelectOption>),
}

pub async fn remote_options(State(state): State<ServerState>, Path(source): Path<String>, Query(q): Query<OptionsQuery>) -> ApiResult<OptionsResponse> {
    let source: DataSource = source.parse()?;
    if let Some(raw) = q.ids.as_deref() {
        let ids = parse_ids(raw)?;
        return Ok(Json(OptionsResponse::Selected(options::display_names(&state.db, source, &ids).await?)));
    }
    let page = options::options(&state.db, source, q.search.as_deref(), q.page.unwrap_or(1)).await?;
    Ok(Json(OptionsResponse::Page(page)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_parsed_from_csv() {
        assert_eq!(parse_ids("1, 2,,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_ids("1,x").is_err());
    }
}
