//! Recurring payments and their billing schedule.

use chrono::{DateTime, Duration, FixedOffset, Months, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use models::recurring_payment::{self, CyclePeriod};
use models::recurring_payment_history as history;

use super::order::get_order;
use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecurringPaymentInput {
    pub initial_order_id: i32,
    pub cycle_length: i32,
    pub cycle_period: CyclePeriod,
    #[serde(default)]
    pub total_cycles: i32,
    #[serde(default)]
    pub start_date_utc: Option<DateTime<FixedOffset>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecurringPaymentUpdate {
    pub cycle_length: i32,
    pub total_cycles: i32,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecurringPaymentDetails {
    #[serde(flatten)]
    pub payment: recurring_payment::Model,
    pub history: Vec<history::Model>,
    /// `None` when unlimited.
    pub cycles_remaining: Option<i32>,
    pub next_payment_date: Option<DateTime<FixedOffset>>,
}

/// Adds `n` periods to `start`. Month and year steps clamp to the last day of the month.
pub fn add_periods(start: DateTime<FixedOffset>, period: CyclePeriod, n: i32) -> Option<DateTime<FixedOffset>> {
    let n = u32::try_from(n).ok()?;
    match period {
        CyclePeriod::Days => start.checked_add_signed(Duration::days(n as i64)),
        CyclePeriod::Weeks => start.checked_add_signed(Duration::weeks(n as i64)),
        CyclePeriod::Months => start.checked_add_months(Months::new(n)),
        CyclePeriod::Years => start.checked_add_months(Months::new(n.checked_mul(12)?)),
    }
}

/// `None` means unlimited.
pub fn cycles_remaining(total_cycles: i32, history_count: i32) -> Option<i32> {
    if total_cycles <= 0 {
        return None;
    }
    Some((total_cycles - history_count).max(0))
}

pub fn next_payment_date(payment: &recurring_payment::Model, history_count: i32) -> Option<DateTime<FixedOffset>> {
    if !payment.is_active || payment.deleted {
        return None;
    }
    if cycles_remaining(payment.total_cycles, history_count) == Some(0) {
        return None;
    }
    add_periods(
        payment.start_date_utc,
        payment.cycle_period,
        history_count.checked_mul(payment.cycle_length)?,
    )
}

fn validate_schedule(cycle_length: i32, total_cycles: i32) -> Result<(), ServiceError> {
    if cycle_length < 1 {
        return Err(ServiceError::validation("cycle length must be at least 1"));
    }
    if total_cycles < 0 {
        return Err(ServiceError::validation("total cycles must not be negative"));
    }
    Ok(())
}

async fn history_of(db: &DatabaseConnection, id: i32) -> Result<Vec<history::Model>, ServiceError> {
    Ok(history::Entity::find()
        .filter(history::Column::RecurringPaymentId.eq(id))
        .order_by_asc(history::Column::CreatedOnUtc)
        .order_by_asc(history::Column::Id)
        .all(db)
        .await?)
}

pub async fn list_recurring_payments(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<recurring_payment::Model>, ServiceError> {
    let mut q = recurring_payment::Entity::find().filter(recurring_payment::Column::Deleted.eq(false));
    if cmd.sort.is_none() {
        q = q.order_by_desc(recurring_payment::Column::StartDateUtc);
    }
    fetch_grid(db, q, cmd).await
}

async fn find_live(db: &DatabaseConnection, id: i32) -> Result<recurring_payment::Model, ServiceError> {
    recurring_payment::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|p| !p.deleted)
        .ok_or_else(|| ServiceError::not_found("recurring payment"))
}

pub async fn get_recurring_payment(db: &DatabaseConnection, id: i32) -> Result<RecurringPaymentDetails, ServiceError> {
    let payment = find_live(db, id).await?;
    let history = history_of(db, id).await?;
    let count = history.len() as i32;
    Ok(RecurringPaymentDetails {
        cycles_remaining: cycles_remaining(payment.total_cycles, count),
        next_payment_date: next_payment_date(&payment, count),
        payment,
        history,
    })
}

pub async fn create_recurring_payment(db: &DatabaseConnection, input: RecurringPaymentInput) -> Result<RecurringPaymentDetails, ServiceError> {
    validate_schedule(input.cycle_length, input.total_cycles)?;
    let order = get_order(db, input.initial_order_id).await?;
    let now: DateTime<FixedOffset> = Utc::now().into();
    let created = recurring_payment::ActiveModel {
        initial_order_id: Set(order.id),
        cycle_length: Set(input.cycle_length),
        cycle_period: Set(input.cycle_period),
        total_cycles: Set(input.total_cycles),
        start_date_utc: Set(input.start_date_utc.unwrap_or(now)),
        is_active: Set(true),
        deleted: Set(false),
        created_on_utc: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    get_recurring_payment(db, created.id).await
}

pub async fn update_recurring_payment(db: &DatabaseConnection, id: i32, input: RecurringPaymentUpdate) -> Result<RecurringPaymentDetails, ServiceError> {
    validate_schedule(input.cycle_length, input.total_cycles)?;
    let mut am: recurring_payment::ActiveModel = find_live(db, id).await?.into();
    am.cycle_length = Set(input.cycle_length);
    am.total_cycles = Set(input.total_cycles);
    am.is_active = Set(input.is_active);
    am.update(db).await?;
    get_recurring_payment(db, id).await
}

pub async fn delete_recurring_payment(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let mut am: recurring_payment::ActiveModel = find_live(db, id).await?.into();
    am.deleted = Set(true);
    am.is_active = Set(false);
    am.update(db).await?;
    Ok(())
}

/// Records the next cycle as paid.
#[instrument(skip(db))]
pub async fn process_next_payment(db: &DatabaseConnection, id: i32, order_id: Option<i32>) -> Result<RecurringPaymentDetails, ServiceError> {
    let payment = find_live(db, id).await?;
    let txn = db.begin().await?;
    let count = history::Entity::find()
        .filter(history::Column::RecurringPaymentId.eq(id))
        .count(&txn)
        .await? as i32;
    if next_payment_date(&payment, count).is_none() {
        return Err(ServiceError::validation("no payment is due for this recurring payment"));
    }
    history::ActiveModel {
        recurring_payment_id: Set(id),
        order_id: Set(order_id),
        created_on_utc: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    info!(id, cycle = count + 1, "recurring payment processed");
    get_recurring_payment(db, id).await
}

pub async fn cancel(db: &DatabaseConnection, id: i32) -> Result<RecurringPaymentDetails, ServiceError> {
    let payment = find_live(db, id).await?;
    if payment.is_active {
        let mut am: recurring_payment::ActiveModel = payment.into();
        am.is_active = Set(false);
        am.update(db).await?;
    }
    get_recurring_payment(db, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn payment(total_cycles: i32, is_active: bool) -> recurring_payment::Model {
        recurring_payment::Model {
            id: 1,
            initial_order_id: 1,
            cycle_length: 1,
            cycle_period: CyclePeriod::Months,
            total_cycles,
            start_date_utc: at(2024, 1, 31),
            is_active,
            deleted: false,
            created_on_utc: at(2024, 1, 31),
        }
    }

    #[test]
    fn month_steps_clamp_the_day() {
        assert_eq!(add_periods(at(2024, 1, 31), CyclePeriod::Months, 1), Some(at(2024, 2, 29)));
        assert_eq!(add_periods(at(2023, 1, 31), CyclePeriod::Months, 1), Some(at(2023, 2, 28)));
        assert_eq!(add_periods(at(2024, 2, 29), CyclePeriod::Years, 1), Some(at(2025, 2, 28)));
        assert_eq!(add_periods(at(2024, 1, 1), CyclePeriod::Weeks, 2), Some(at(2024, 1, 15)));
        assert_eq!(add_periods(at(2024, 1, 1), CyclePeriod::Days, 0), Some(at(2024, 1, 1)));
    }

    #[test]
    fn remaining_cycles() {
        assert_eq!(cycles_remaining(0, 7), None);
        assert_eq!(cycles_remaining(3, 1), Some(2));
        assert_eq!(cycles_remaining(3, 5), Some(0));
    }

    #[test]
    fn next_date_follows_history() {
        let p = payment(3, true);
        assert_eq!(next_payment_date(&p, 0), Some(at(2024, 1, 31)));
        assert_eq!(next_payment_date(&p, 2), Some(at(2024, 3, 31)));
        assert_eq!(next_payment_date(&p, 3), None);
        assert_eq!(next_payment_date(&payment(0, true), 10), Some(at(2024, 11, 30)));
        assert_eq!(next_payment_date(&payment(3, false), 0), None);
    }

    #[tokio::test]
    async fn process_until_exhausted() -> Result<(), anyhow::Error> {
        use crate::customer::{create_customer, CustomerInput};
        use crate::sales::order::{create_order, OrderInput};
        use crate::test_support::{get_db, unique};

        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let c = create_customer(&db, CustomerInput::email(&format!("{}@example.com", unique("sub")))).await?;
        let order = create_order(&db, OrderInput { customer_id: c.customer.id, order_total: 10.0, shipping_required: false }).await?;
        let rp = create_recurring_payment(&db, RecurringPaymentInput {
            initial_order_id: order.id,
            cycle_length: 1,
            cycle_period: CyclePeriod::Months,
            total_cycles: 2,
            start_date_utc: Some(at(2024, 1, 31)),
        })
        .await?;
        assert_eq!(rp.cycles_remaining, Some(2));

        process_next_payment(&db, rp.payment.id, Some(order.id)).await?;
        let after = process_next_payment(&db, rp.payment.id, None).await?;
        assert_eq!(after.cycles_remaining, Some(0));
        assert_eq!(after.next_payment_date, None);
        assert!(process_next_payment(&db, rp.payment.id, None).await.is_err());

        let cancelled = cancel(&db, rp.payment.id).await?;
        assert!(!cancelled.payment.is_active);
        assert!(update_recurring_payment(&db, rp.payment.id, RecurringPaymentUpdate { cycle_length: 0, total_cycles: 1, is_active: true }).await.is_err());
        delete_recurring_payment(&db, rp.payment.id).await?;
        assert!(get_recurring_payment(&db, rp.payment.id).await.is_err());
        Ok(())
    }
}
