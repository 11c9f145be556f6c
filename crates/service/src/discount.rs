//! Discounts and their cart rule set assignments.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use models::discount::{self, DiscountLimitation, DiscountType};
use models::discount_rule_set;
use models::rule_set::{self, RuleScope};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscountInput {
    pub name: String,
    pub discount_type: DiscountType,
    #[serde(default)]
    pub use_percentage: bool,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub starts_on_utc: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub ends_on_utc: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub requires_coupon_code: bool,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default = "unlimited")]
    pub limitation: DiscountLimitation,
    #[serde(default)]
    pub limitation_times: i32,
}

fn unlimited() -> DiscountLimitation { DiscountLimitation::Unlimited }

#[cfg(test)]
impl DiscountInput {
    pub fn amount(name: &str, amount: f64) -> Self {
        Self {
            name: name.into(),
            discount_type: DiscountType::AssignedToOrderTotal,
            use_percentage: false,
            discount_percentage: 0.0,
            discount_amount: amount,
            starts_on_utc: None,
            ends_on_utc: None,
            requires_coupon_code: false,
            coupon_code: None,
            limitation: DiscountLimitation::Unlimited,
            limitation_times: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscountDetails {
    #[serde(flatten)]
    pub discount: discount::Model,
    pub rule_set_ids: Vec<i32>,
}

/// Field checks that need no database. Returns the normalized coupon code.
pub fn validate(input: &DiscountInput) -> Result<Option<String>, ServiceError> {
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("discount name required"));
    }
    if input.use_percentage {
        if !(0.0..=100.0).contains(&input.discount_percentage) {
            return Err(ServiceError::validation("discount percentage must be between 0 and 100"));
        }
    } else if !(input.discount_amount.is_finite() && input.discount_amount >= 0.0) {
        return Err(ServiceError::validation("discount amount must not be negative"));
    }
    if let (Some(start), Some(end)) = (input.starts_on_utc, input.ends_on_utc) {
        if start > end {
            return Err(ServiceError::validation("start date must not be after end date"));
        }
    }
    if input.limitation != DiscountLimitation::Unlimited && input.limitation_times < 1 {
        return Err(ServiceError::validation("limitation times must be at least 1"));
    }
    let coupon = input.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(str::to_string);
    if input.requires_coupon_code && coupon.is_none() {
        return Err(ServiceError::validation("coupon code required"));
    }
    Ok(if input.requires_coupon_code { coupon } else { None })
}

async fn ensure_coupon_free(db: &DatabaseConnection, coupon: &Option<String>, except: Option<i32>) -> Result<(), ServiceError> {
    let Some(code) = coupon else { return Ok(()) };
    let mut q = discount::Entity::find().filter(discount::Column::CouponCode.eq(code.as_str()));
    if let Some(id) = except {
        q = q.filter(discount::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("coupon code {code} is already used")));
    }
    Ok(())
}

pub async fn rule_set_ids_of<C: ConnectionTrait>(db: &C, discount_id: i32) -> Result<Vec<i32>, ServiceError> {
    Ok(discount_rule_set::Entity::find()
        .filter(discount_rule_set::Column::DiscountId.eq(discount_id))
        .order_by_asc(discount_rule_set::Column::RuleSetId)
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.rule_set_id)
        .collect())
}

pub async fn list_discounts(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<discount::Model>, ServiceError> {
    let mut q = discount::Entity::find();
    if let Some(term) = cmd.search_term() {
        q = q.filter(discount::Column::Name.contains(term).or(discount::Column::CouponCode.eq(term)));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(discount::Column::Name);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_discount(db: &DatabaseConnection, id: i32) -> Result<DiscountDetails, ServiceError> {
    let discount = discount::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("discount"))?;
    Ok(DiscountDetails { rule_set_ids: rule_set_ids_of(db, id).await?, discount })
}

pub async fn create_discount(db: &DatabaseConnection, input: DiscountInput) -> Result<DiscountDetails, ServiceError> {
    let coupon = validate(&input)?;
    ensure_coupon_free(db, &coupon, None).await?;
    let now = Utc::now();
    let created = discount::ActiveModel {
        name: Set(input.name.trim().to_string()),
        discount_type: Set(input.discount_type),
        use_percentage: Set(input.use_percentage),
        discount_percentage: Set(input.discount_percentage),
        discount_amount: Set(input.discount_amount),
        starts_on_utc: Set(input.starts_on_utc),
        ends_on_utc: Set(input.ends_on_utc),
        requires_coupon_code: Set(input.requires_coupon_code),
        coupon_code: Set(coupon),
        limitation: Set(input.limitation),
        limitation_times: Set(input.limitation_times),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(DiscountDetails { discount: created, rule_set_ids: vec![] })
}

pub async fn update_discount(db: &DatabaseConnection, id: i32, input: DiscountInput) -> Result<DiscountDetails, ServiceError> {
    let current = get_discount(db, id).await?;
    let coupon = validate(&input)?;
    ensure_coupon_free(db, &coupon, Some(id)).await?;
    let mut am: discount::ActiveModel = current.discount.into();
    am.name = Set(input.name.trim().to_string());
    am.discount_type = Set(input.discount_type);
    am.use_percentage = Set(input.use_percentage);
    am.discount_percentage = Set(input.discount_percentage);
    am.discount_amount = Set(input.discount_amount);
    am.starts_on_utc = Set(input.starts_on_utc);
    am.ends_on_utc = Set(input.ends_on_utc);
    am.requires_coupon_code = Set(input.requires_coupon_code);
    am.coupon_code = Set(coupon);
    am.limitation = Set(input.limitation);
    am.limitation_times = Set(input.limitation_times);
    am.updated_on_utc = Set(Utc::now().into());
    let discount = am.update(db).await?;
    Ok(DiscountDetails { discount, rule_set_ids: current.rule_set_ids })
}

pub async fn delete_discount(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    discount_rule_set::Entity::delete_many()
        .filter(discount_rule_set::Column::DiscountId.eq(id))
        .exec(&txn)
        .await?;
    let res = discount::Entity::delete_by_id(id).exec(&txn).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("discount"));
    }
    txn.commit().await?;
    Ok(())
}

/// Replaces the discount's rule sets. Only top-level cart rule sets qualify.
pub async fn set_rule_sets(db: &DatabaseConnection, discount_id: i32, ids: &[i32]) -> Result<Vec<i32>, ServiceError> {
    get_discount(db, discount_id).await?;
    let wanted: BTreeSet<i32> = ids.iter().copied().collect();
    let sets = rule_set::Entity::find()
        .filter(rule_set::Column::Id.is_in(wanted.iter().copied()))
        .all(db)
        .await?;
    if sets.len() != wanted.len() {
        return Err(ServiceError::validation("unknown rule set id"));
    }
    if let Some(bad) = sets.iter().find(|s| s.scope != RuleScope::Cart || s.is_sub_group) {
        return Err(ServiceError::validation(format!("rule set {} is not a cart rule set", bad.id)));
    }

    let txn = db.begin().await?;
    let existing: BTreeSet<i32> = rule_set_ids_of(&txn, discount_id).await?.into_iter().collect();
    let removed: Vec<i32> = existing.difference(&wanted).copied().collect();
    if !removed.is_empty() {
        discount_rule_set::Entity::delete_many()
            .filter(discount_rule_set::Column::DiscountId.eq(discount_id))
            .filter(discount_rule_set::Column::RuleSetId.is_in(removed))
            .exec(&txn)
            .await?;
    }
    for id in wanted.difference(&existing) {
        discount_rule_set::ActiveModel { discount_id: Set(discount_id), rule_set_id: Set(*id), ..Default::default() }
            .insert(&txn)
            .await?;
    }
    txn.commit().await?;
    Ok(wanted.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::service::{create_rule_set, RuleSetInput};
    use crate::test_support::{get_db, unique};
    use chrono::TimeZone;

    #[test]
    fn field_rules() {
        let mut d = DiscountInput::amount("Ten off", 10.0);
        assert_eq!(validate(&d).unwrap(), None);

        d.use_percentage = true;
        d.discount_percentage = 120.0;
        assert!(validate(&d).is_err());
        d.discount_percentage = 15.0;
        assert!(validate(&d).is_ok());

        d.requires_coupon_code = true;
        d.coupon_code = Some("   ".into());
        assert!(validate(&d).is_err());
        d.coupon_code = Some(" SAVE15 ".into());
        assert_eq!(validate(&d).unwrap().as_deref(), Some("SAVE15"));

        d.limitation = DiscountLimitation::NTimesOnly;
        assert!(validate(&d).is_err());
        d.limitation_times = 2;
        assert!(validate(&d).is_ok());

        let utc = FixedOffset::east_opt(0).unwrap();
        d.starts_on_utc = Some(utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
        d.ends_on_utc = Some(utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert!(validate(&d).is_err());
    }

    #[tokio::test]
    async fn coupon_unique_and_cart_rule_sets_only() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let code = unique("CODE");
        let mut input = DiscountInput::amount("Coupon", 5.0);
        input.requires_coupon_code = true;
        input.coupon_code = Some(code.clone());
        let d = create_discount(&db, input.clone()).await?;
        assert!(matches!(create_discount(&db, input).await.unwrap_err(), ServiceError::Conflict(_)));

        let cart = create_rule_set(&db, RuleSetInput::new("Big carts", RuleScope::Cart)).await?;
        let customers = create_rule_set(&db, RuleSetInput::new("VIPs", RuleScope::Customer)).await?;
        assert!(set_rule_sets(&db, d.discount.id, &[customers.id]).await.is_err());
        assert_eq!(set_rule_sets(&db, d.discount.id, &[cart.id]).await?, vec![cart.id]);
        assert_eq!(get_discount(&db, d.discount.id).await?.rule_set_ids, vec![cart.id]);
        assert!(set_rule_sets(&db, d.discount.id, &[]).await?.is_empty());

        delete_discount(&db, d.discount.id).await?;
        Ok(())
    }
}
