//! Scope providers: descriptors plus entity matching for rule previews.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use models::order::{self, OrderStatus};
use models::rule_set::RuleScope;
use models::{customer, customer_role_mapping, product, product_category};

use super::descriptor::{descriptors, RuleDescriptor};
use super::expression::RuleExpressionGroup;
use super::facts::{CustomerFacts, ProductFacts};
use crate::errors::ServiceError;
use crate::grid::{GridCommand, GridModel};

#[async_trait]
pub trait RuleProvider: Send + Sync {
    fn scope(&self) -> RuleScope;

    fn descriptors(&self) -> Vec<RuleDescriptor> {
        descriptors(self.scope())
    }

    /// Ids of the entities the expression matches, paged.
    async fn matching(
        &self,
        db: &DatabaseConnection,
        expr: &RuleExpressionGroup,
        cmd: &GridCommand,
    ) -> Result<GridModel<i32>, ServiceError>;
}

pub struct CustomerRuleProvider;

/// Facts for every active customer.
pub async fn customer_facts(db: &DatabaseConnection) -> Result<Vec<CustomerFacts>, ServiceError> {
    let customers = customer::Entity::find()
        .filter(customer::Column::Deleted.eq(false))
        .filter(customer::Column::Active.eq(true))
        .order_by_asc(customer::Column::Id)
        .all(db)
        .await?;
    let mut roles: HashMap<i32, Vec<i32>> = HashMap::new();
    for m in customer_role_mapping::Entity::find().all(db).await? {
        roles.entry(m.customer_id).or_default().push(m.customer_role_id);
    }
    let mut stats: HashMap<i32, (i64, f64)> = HashMap::new();
    for o in order::Entity::find()
        .filter(order::Column::OrderStatus.ne(OrderStatus::Cancelled))
        .all(db)
        .await?
    {
        let entry = stats.entry(o.customer_id).or_default();
        entry.0 += 1;
        entry.1 += o.order_total;
    }
    let now = Utc::now();
    Ok(customers
        .into_iter()
        .map(|c| {
            let (order_count, spent_amount) = stats.get(&c.id).copied().unwrap_or_default();
            CustomerFacts {
                customer_id: c.id,
                role_ids: roles.remove(&c.id).unwrap_or_default(),
                is_active: c.active,
                tax_exempt: c.is_tax_exempt,
                billing_country_id: c.billing_country_id,
                order_count,
                spent_amount,
                email: Some(c.email),
                created_days: (now - c.created_on_utc.with_timezone(&Utc)).num_days(),
            }
        })
        .collect())
}

#[async_trait]
impl RuleProvider for CustomerRuleProvider {
    fn scope(&self) -> RuleScope { RuleScope::Customer }

    async fn matching(&self, db: &DatabaseConnection, expr: &RuleExpressionGroup, cmd: &GridCommand) -> Result<GridModel<i32>, ServiceError> {
        let ids = customer_facts(db)
            .await?
            .into_iter()
            .filter(|f| expr.evaluate(f))
            .map(|f| f.customer_id)
            .collect();
        Ok(GridModel::from_vec(ids, cmd))
    }
}

pub struct ProductRuleProvider;

pub async fn product_facts(db: &DatabaseConnection) -> Result<Vec<ProductFacts>, ServiceError> {
    let products = product::Entity::find()
        .filter(product::Column::Deleted.eq(false))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?;
    let mut categories: HashMap<i32, Vec<i32>> = HashMap::new();
    for pc in product_category::Entity::find().all(db).await? {
        categories.entry(pc.product_id).or_default().push(pc.category_id);
    }
    Ok(products
        .into_iter()
        .map(|p| ProductFacts {
            category_ids: categories.remove(&p.id).unwrap_or_default(),
            id: p.id,
            manufacturer_id: p.manufacturer_id,
            price: p.price,
            published: p.published,
            stock_quantity: p.stock_quantity,
            sku: p.sku,
            name: p.name,
        })
        .collect())
}

#[async_trait]
impl RuleProvider for ProductRuleProvider {
    fn scope(&self) -> RuleScope { RuleScope::Product }

    async fn matching(&self, db: &DatabaseConnection, expr: &RuleExpressionGroup, cmd: &GridCommand) -> Result<GridModel<i32>, ServiceError> {
        let ids = product_facts(db)
            .await?
            .into_iter()
            .filter(|f| expr.evaluate(f))
            .map(|f| f.id)
            .collect();
        Ok(GridModel::from_vec(ids, cmd))
    }
}

/// Carts are transient; they are evaluated one at a time through `test_cart`.
pub struct CartRuleProvider;

#[async_trait]
impl RuleProvider for CartRuleProvider {
    fn scope(&self) -> RuleScope { RuleScope::Cart }

    async fn matching(&self, _db: &DatabaseConnection, _expr: &RuleExpressionGroup, cmd: &GridCommand) -> Result<GridModel<i32>, ServiceError> {
        Ok(GridModel::empty(cmd))
    }
}

pub fn provider_for(scope: RuleScope) -> &'static dyn RuleProvider {
    match scope {
        RuleScope::Customer => &CustomerRuleProvider,
        RuleScope::Product => &ProductRuleProvider,
        RuleScope::Cart => &CartRuleProvider,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_cover_every_scope() {
        for scope in [RuleScope::Cart, RuleScope::Customer, RuleScope::Product] {
            let p = provider_for(scope);
            assert_eq!(p.scope(), scope);
            assert!(!p.descriptors().is_empty());
        }
    }
}
