//! Admin operations on rule sets and their rules.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use models::discount_rule_set;
use models::rule::{self, GROUP_RULE_TYPE};
use models::rule_set::{self, LogicalOperator, RuleScope};

use super::descriptor::find_descriptor;
use super::engine::RuleEngine;
use super::expression::{load_sets, parse_operand, MAX_DEPTH};
use super::facts::CartFacts;
use super::operator::RuleOperator;
use super::provider::provider_for;
use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleSetInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub scope: RuleScope,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_operator")]
    pub logical_operator: LogicalOperator,
}

fn default_true() -> bool { true }
fn default_operator() -> LogicalOperator { LogicalOperator::And }

#[cfg(test)]
impl RuleSetInput {
    pub fn new(name: &str, scope: RuleScope) -> Self {
        Self { name: Some(name.into()), description: None, scope, is_active: true, logical_operator: LogicalOperator::And }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleSetUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub logical_operator: LogicalOperator,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleInput {
    pub rule_type: String,
    pub operator: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub id: i32,
    pub operator: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleSetDetails {
    #[serde(flatten)]
    pub rule_set: rule_set::Model,
    pub rules: Vec<rule::Model>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupCreated {
    pub rule: rule::Model,
    pub rule_set: rule_set::Model,
}

fn clean(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Checks type, operator and value of a leaf rule against the scope's descriptors.
pub fn validate_rule(scope: RuleScope, rule_type: &str, operator: &str, value: Option<&str>) -> Result<RuleOperator, ServiceError> {
    if rule_type == GROUP_RULE_TYPE {
        return Err(ServiceError::validation("group rules are created with add_group"));
    }
    let descriptor = find_descriptor(scope, rule_type)
        .ok_or_else(|| ServiceError::validation(format!("unknown rule type {rule_type} for {scope:?} rules")))?;
    let op: RuleOperator = operator.parse()?;
    if !descriptor.value_type.allows(op) {
        return Err(ServiceError::validation(format!("operator {op} is not allowed for {rule_type}")));
    }
    if parse_operand(descriptor.value_type, op, value).is_none() {
        return Err(ServiceError::validation(format!("invalid value for {rule_type}: {}", value.unwrap_or(""))));
    }
    Ok(op)
}

async fn rules_of<C: ConnectionTrait>(db: &C, rule_set_id: i32) -> Result<Vec<rule::Model>, ServiceError> {
    Ok(rule::Entity::find()
        .filter(rule::Column::RuleSetId.eq(rule_set_id))
        .order_by_asc(rule::Column::DisplayOrder)
        .order_by_asc(rule::Column::Id)
        .all(db)
        .await?)
}

async fn find_set<C: ConnectionTrait>(db: &C, id: i32) -> Result<rule_set::Model, ServiceError> {
    rule_set::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("rule set"))
}

async fn touch<C: ConnectionTrait>(db: &C, set: rule_set::Model) -> Result<rule_set::Model, ServiceError> {
    let mut am: rule_set::ActiveModel = set.into();
    am.updated_on_utc = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Group rule that nests `rule_set_id`, if any.
async fn parent_group<C: ConnectionTrait>(db: &C, rule_set_id: i32) -> Result<Option<rule::Model>, ServiceError> {
    Ok(rule::Entity::find()
        .filter(rule::Column::RuleType.eq(GROUP_RULE_TYPE))
        .filter(rule::Column::Value.eq(rule_set_id.to_string()))
        .one(db)
        .await?)
}

/// Nesting level of a set: 0 for a root set.
async fn depth_of<C: ConnectionTrait>(db: &C, rule_set_id: i32) -> Result<usize, ServiceError> {
    let mut depth = 0;
    let mut seen = HashSet::from([rule_set_id]);
    let mut current = rule_set_id;
    while let Some(parent) = parent_group(db, current).await? {
        if !seen.insert(parent.rule_set_id) {
            return Err(ServiceError::validation(format!("rule set {rule_set_id} is part of a group cycle")));
        }
        depth += 1;
        current = parent.rule_set_id;
    }
    Ok(depth)
}

pub async fn list_rule_sets(db: &DatabaseConnection, scope: Option<RuleScope>, cmd: &GridCommand) -> Result<GridModel<rule_set::Model>, ServiceError> {
    let mut q = rule_set::Entity::find().filter(rule_set::Column::IsSubGroup.eq(false));
    if let Some(scope) = scope {
        q = q.filter(rule_set::Column::Scope.eq(scope));
    }
    if let Some(term) = cmd.search_term() {
        q = q.filter(rule_set::Column::Name.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(rule_set::Column::Name).order_by_asc(rule_set::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_rule_set(db: &DatabaseConnection, id: i32) -> Result<RuleSetDetails, ServiceError> {
    let rule_set = find_set(db, id).await?;
    Ok(RuleSetDetails { rules: rules_of(db, id).await?, rule_set })
}

pub async fn create_rule_set(db: &DatabaseConnection, input: RuleSetInput) -> Result<rule_set::Model, ServiceError> {
    let name = clean(input.name).ok_or_else(|| ServiceError::validation("rule set name required"))?;
    let now = Utc::now();
    let created = rule_set::ActiveModel {
        name: Set(Some(name)),
        description: Set(clean(input.description)),
        scope: Set(input.scope),
        is_active: Set(input.is_active),
        is_sub_group: Set(false),
        logical_operator: Set(input.logical_operator),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(id = created.id, scope = ?created.scope, "rule set created");
    Ok(created)
}

pub async fn update_rule_set(db: &DatabaseConnection, engine: &RuleEngine, id: i32, input: RuleSetUpdate) -> Result<rule_set::Model, ServiceError> {
    let current = find_set(db, id).await?;
    let name = clean(input.name);
    if !current.is_sub_group && name.is_none() {
        return Err(ServiceError::validation("rule set name required"));
    }
    let mut am: rule_set::ActiveModel = current.into();
    am.name = Set(name);
    am.description = Set(clean(input.description));
    am.is_active = Set(input.is_active);
    am.logical_operator = Set(input.logical_operator);
    am.updated_on_utc = Set(Utc::now().into());
    let updated = am.update(db).await?;
    engine.invalidate();
    Ok(updated)
}

/// Removes a set, every sub group below it, their rules and discount links,
/// plus the group rule that nests it.
async fn delete_tree<C: ConnectionTrait>(db: &C, id: i32) -> Result<Vec<i32>, ServiceError> {
    let loaded = load_sets(db, id).await?;
    let ids: Vec<i32> = loaded
        .values()
        .filter(|l| l.set.id == id || l.set.is_sub_group)
        .map(|l| l.set.id)
        .collect();
    if let Some(group) = parent_group(db, id).await? {
        rule::Entity::delete_by_id(group.id).exec(db).await?;
    }
    discount_rule_set::Entity::delete_many()
        .filter(discount_rule_set::Column::RuleSetId.is_in(ids.clone()))
        .exec(db)
        .await?;
    rule::Entity::delete_many().filter(rule::Column::RuleSetId.is_in(ids.clone())).exec(db).await?;
    rule_set::Entity::delete_many().filter(rule_set::Column::Id.is_in(ids.clone())).exec(db).await?;
    Ok(ids)
}

#[instrument(skip(db, engine))]
pub async fn delete_rule_set(db: &DatabaseConnection, engine: &RuleEngine, id: i32) -> Result<usize, ServiceError> {
    find_set(db, id).await?;
    let txn = db.begin().await?;
    let removed = delete_tree(&txn, id).await?;
    txn.commit().await?;
    engine.invalidate();
    info!(id, removed = removed.len(), "rule set deleted");
    Ok(removed.len())
}

pub async fn add_rule(db: &DatabaseConnection, engine: &RuleEngine, rule_set_id: i32, input: RuleInput) -> Result<rule::Model, ServiceError> {
    let set = find_set(db, rule_set_id).await?;
    let rule_type = input.rule_type.trim().to_string();
    let op = validate_rule(set.scope, &rule_type, &input.operator, input.value.as_deref())?;
    let txn = db.begin().await?;
    let created = rule::ActiveModel {
        rule_set_id: Set(rule_set_id),
        rule_type: Set(rule_type),
        operator: Set(op.token().to_string()),
        value: Set(if op.is_unary() { None } else { input.value.map(|v| v.trim().to_string()) }),
        display_order: Set(input.display_order),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    touch(&txn, set).await?;
    txn.commit().await?;
    engine.invalidate();
    Ok(created)
}

/// Batch edit of operator, value and order. Every rule must belong to the set.
pub async fn update_rules(db: &DatabaseConnection, engine: &RuleEngine, rule_set_id: i32, updates: Vec<RuleUpdate>) -> Result<Vec<rule::Model>, ServiceError> {
    let set = find_set(db, rule_set_id).await?;
    let existing = rules_of(db, rule_set_id).await?;
    let mut changes = Vec::with_capacity(updates.len());
    for u in updates {
        let current = existing
            .iter()
            .find(|r| r.id == u.id)
            .ok_or_else(|| ServiceError::validation(format!("rule {} does not belong to rule set {rule_set_id}", u.id)))?;
        let (operator, value) = if current.is_group() {
            (current.operator.clone(), current.value.clone())
        } else {
            let op = validate_rule(set.scope, &current.rule_type, &u.operator, u.value.as_deref())?;
            (op.token().to_string(), if op.is_unary() { None } else { u.value.map(|v| v.trim().to_string()) })
        };
        let mut am: rule::ActiveModel = current.clone().into();
        am.operator = Set(operator);
        am.value = Set(value);
        am.display_order = Set(u.display_order);
        changes.push(am);
    }
    let txn = db.begin().await?;
    let mut saved = Vec::with_capacity(changes.len());
    for am in changes {
        saved.push(am.update(&txn).await?);
    }
    touch(&txn, set).await?;
    txn.commit().await?;
    engine.invalidate();
    Ok(saved)
}

pub async fn delete_rule(db: &DatabaseConnection, engine: &RuleEngine, rule_id: i32) -> Result<(), ServiceError> {
    let rule = rule::Entity::find_by_id(rule_id).one(db).await?.ok_or_else(|| ServiceError::not_found("rule"))?;
    if rule.is_group() {
        return delete_group(db, engine, rule_id).await;
    }
    let set = find_set(db, rule.rule_set_id).await?;
    let txn = db.begin().await?;
    rule::Entity::delete_by_id(rule_id).exec(&txn).await?;
    touch(&txn, set).await?;
    txn.commit().await?;
    engine.invalidate();
    Ok(())
}

/// Creates a sub group of the parent's scope and the `Group` rule that nests it.
#[instrument(skip(db, engine))]
pub async fn add_group(db: &DatabaseConnection, engine: &RuleEngine, parent_id: i32) -> Result<GroupCreated, ServiceError> {
    let parent = find_set(db, parent_id).await?;
    if depth_of(db, parent_id).await? + 1 > MAX_DEPTH {
        return Err(ServiceError::validation(format!("rule groups cannot be nested deeper than {MAX_DEPTH} levels")));
    }
    let next_order = rules_of(db, parent_id).await?.iter().map(|r| r.display_order).max().unwrap_or(0) + 1;
    let now = Utc::now();
    let txn = db.begin().await?;
    let child = rule_set::ActiveModel {
        name: Set(None),
        description: Set(None),
        scope: Set(parent.scope),
        is_active: Set(true),
        is_sub_group: Set(true),
        logical_operator: Set(LogicalOperator::And),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let rule = rule::ActiveModel {
        rule_set_id: Set(parent_id),
        rule_type: Set(GROUP_RULE_TYPE.to_string()),
        operator: Set(RuleOperator::Equal.token().to_string()),
        value: Set(Some(child.id.to_string())),
        display_order: Set(next_order),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    touch(&txn, parent).await?;
    txn.commit().await?;
    engine.invalidate();
    Ok(GroupCreated { rule, rule_set: child })
}

/// Removes a `Group` rule together with the sub group it points at.
pub async fn delete_group(db: &DatabaseConnection, engine: &RuleEngine, rule_id: i32) -> Result<(), ServiceError> {
    let rule = rule::Entity::find_by_id(rule_id).one(db).await?.ok_or_else(|| ServiceError::not_found("rule"))?;
    let child = rule.group_target().ok_or_else(|| ServiceError::validation("rule is not a group"))?;
    let txn = db.begin().await?;
    match rule_set::Entity::find_by_id(child).one(&txn).await? {
        Some(set) if set.is_sub_group => {
            delete_tree(&txn, child).await?;
        }
        _ => {}
    }
    rule::Entity::delete_by_id(rule_id).exec(&txn).await?;
    txn.commit().await?;
    engine.invalidate();
    Ok(())
}

pub async fn change_operator(db: &DatabaseConnection, engine: &RuleEngine, id: i32, op: LogicalOperator) -> Result<rule_set::Model, ServiceError> {
    let mut am: rule_set::ActiveModel = find_set(db, id).await?.into();
    am.logical_operator = Set(op);
    am.updated_on_utc = Set(Utc::now().into());
    let updated = am.update(db).await?;
    engine.invalidate();
    Ok(updated)
}

/// Ids of the entities the set currently matches.
pub async fn preview(db: &DatabaseConnection, engine: &RuleEngine, id: i32, cmd: &GridCommand) -> Result<GridModel<i32>, ServiceError> {
    let expr = engine.expression(db, id).await?;
    provider_for(expr.scope).matching(db, &expr, cmd).await
}

pub async fn test_cart(db: &DatabaseConnection, engine: &RuleEngine, id: i32, cart: &CartFacts) -> Result<bool, ServiceError> {
    let expr = engine.expression(db, id).await?;
    if expr.scope != RuleScope::Cart {
        return Err(ServiceError::validation("only cart rule sets can be tested against a cart"));
    }
    Ok(expr.evaluate(cart))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::product::{create_product, ProductInput};
    use crate::discount::{create_discount, get_discount, set_rule_sets, DiscountInput};
    use crate::test_support::get_db;

    fn rule(rule_type: &str, operator: &str, value: &str) -> RuleInput {
        RuleInput { rule_type: rule_type.into(), operator: operator.into(), value: Some(value.into()), display_order: 0 }
    }

    #[test]
    fn rule_validation() {
        assert!(validate_rule(RuleScope::Cart, "CartTotal", ">=", Some("10")).is_ok());
        assert!(validate_rule(RuleScope::Cart, "CartTotal", "Contains", Some("10")).is_err());
        assert!(validate_rule(RuleScope::Cart, "CartTotal", ">=", Some("ten")).is_err());
        assert!(validate_rule(RuleScope::Customer, "CartTotal", ">=", Some("10")).is_err());
        assert!(validate_rule(RuleScope::Product, "Sku", "IsEmpty", None).is_ok());
        assert!(validate_rule(RuleScope::Product, GROUP_RULE_TYPE, "=", Some("1")).is_err());
    }

    #[tokio::test]
    async fn cart_rules_with_groups() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let engine = RuleEngine::default();
        let set = create_rule_set(&db, RuleSetInput::new("Big or VIP", RuleScope::Cart)).await?;
        add_rule(&db, &engine, set.id, rule("CartTotal", ">=", "100")).await?;
        assert!(add_rule(&db, &engine, set.id, rule("CartTotal", "StartsWith", "1")).await.is_err());

        let cart = CartFacts { total: 150.0, ..Default::default() };
        assert!(test_cart(&db, &engine, set.id, &cart).await?);

        let group = add_group(&db, &engine, set.id).await?;
        assert!(group.rule_set.is_sub_group);
        change_operator(&db, &engine, group.rule_set.id, LogicalOperator::Or).await?;
        add_rule(&db, &engine, group.rule_set.id, rule("CouponCode", "=", "VIP")).await?;
        add_rule(&db, &engine, group.rule_set.id, rule("CartItemCount", ">", "5")).await?;
        assert!(!test_cart(&db, &engine, set.id, &cart).await?);
        let vip = CartFacts { coupon_code: Some("vip".into()), ..cart.clone() };
        assert!(test_cart(&db, &engine, set.id, &vip).await?);

        let listed = list_rule_sets(&db, Some(RuleScope::Cart), &GridCommand::default()).await?;
        assert!(listed.rows.iter().all(|s| !s.is_sub_group));

        delete_rule(&db, &engine, group.rule.id).await?;
        assert!(get_rule_set(&db, group.rule_set.id).await.is_err());
        assert!(test_cart(&db, &engine, set.id, &cart).await?);
        Ok(())
    }

    #[tokio::test]
    async fn batch_update_and_delete_cleanup() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let engine = RuleEngine::default();
        let set = create_rule_set(&db, RuleSetInput::new("Carts", RuleScope::Cart)).await?;
        let r = add_rule(&db, &engine, set.id, rule("CartTotal", ">", "10")).await?;
        let saved = update_rules(&db, &engine, set.id, vec![RuleUpdate { id: r.id, operator: "<".into(), value: Some("5".into()), display_order: 3 }]).await?;
        assert_eq!(saved[0].operator, "<");
        assert!(update_rules(&db, &engine, set.id, vec![RuleUpdate { id: 9999, operator: "<".into(), value: None, display_order: 0 }]).await.is_err());

        let g = add_group(&db, &engine, set.id).await?;
        let inner = add_group(&db, &engine, g.rule_set.id).await?;
        let discount = create_discount(&db, DiscountInput::amount("Linked", 1.0)).await?;
        set_rule_sets(&db, discount.discount.id, &[set.id]).await?;

        assert_eq!(delete_rule_set(&db, &engine, set.id).await?, 3);
        assert!(get_rule_set(&db, inner.rule_set.id).await.is_err());
        assert!(get_discount(&db, discount.discount.id).await?.rule_set_ids.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn deleting_a_rule_touches_its_set() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let engine = RuleEngine::default();
        let set = create_rule_set(&db, RuleSetInput::new("Touched", RuleScope::Cart)).await?;
        let r = add_rule(&db, &engine, set.id, rule("CartTotal", ">", "10")).await?;
        let mut stale: rule_set::ActiveModel = get_rule_set(&db, set.id).await?.rule_set.into();
        stale.updated_on_utc = Set((Utc::now() - chrono::Duration::days(1)).into());
        let before = stale.update(&db).await?.updated_on_utc;
        delete_rule(&db, &engine, r.id).await?;
        let after = get_rule_set(&db, set.id).await?;
        assert!(after.rule_set.updated_on_utc > before);
        assert!(after.rules.is_empty());
        assert!(delete_rule(&db, &engine, r.id).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn nesting_depth_is_limited() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let engine = RuleEngine::default();
        let root = create_rule_set(&db, RuleSetInput::new("Deep", RuleScope::Customer)).await?;
        let mut current = root.id;
        for _ in 0..MAX_DEPTH {
            current = add_group(&db, &engine, current).await?.rule_set.id;
        }
        assert!(add_group(&db, &engine, current).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn product_preview_lists_matches() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let engine = RuleEngine::default();
        let cheap = create_product(&db, ProductInput { name: "Pen".into(), price: 2.0, published: true, ..Default::default() }).await?;
        create_product(&db, ProductInput { name: "Desk".into(), price: 300.0, published: true, ..Default::default() }).await?;
        let set = create_rule_set(&db, RuleSetInput::new("Cheap", RuleScope::Product)).await?;
        add_rule(&db, &engine, set.id, rule("Price", "<", "10")).await?;

        let page = preview(&db, &engine, set.id, &GridCommand::default()).await?;
        assert_eq!(page.rows, vec![cheap.product.id]);
        assert!(test_cart(&db, &engine, set.id, &CartFacts::default()).await.is_err());
        Ok(())
    }
}
