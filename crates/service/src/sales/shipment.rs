//! Shipments. Every mutation re-derives the owning order's shipping status.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use models::order::ShippingStatus;
use models::shipment;

use super::order::{get_order, recompute_shipping_status};
use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ShipmentFilter {
    #[serde(default)]
    pub order_id: Option<i32>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShipmentInput {
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub total_weight: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShipmentChange {
    pub shipment: shipment::Model,
    pub order_shipping_status: ShippingStatus,
}

fn clean(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn list_shipments(db: &DatabaseConnection, filter: &ShipmentFilter, cmd: &GridCommand) -> Result<GridModel<shipment::Model>, ServiceError> {
    let mut q = shipment::Entity::find();
    if let Some(order_id) = filter.order_id {
        q = q.filter(shipment::Column::OrderId.eq(order_id));
    }
    if let Some(tn) = filter.tracking_number.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        q = q.filter(shipment::Column::TrackingNumber.contains(tn));
    }
    if cmd.sort.is_none() {
        q = q.order_by_desc(shipment::Column::CreatedOnUtc).order_by_desc(shipment::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_shipment(db: &DatabaseConnection, id: i32) -> Result<shipment::Model, ServiceError> {
    shipment::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("shipment"))
}

async fn update_and_recompute(db: &DatabaseConnection, am: shipment::ActiveModel, order_id: i32) -> Result<ShipmentChange, ServiceError> {
    let txn = db.begin().await?;
    let shipment = am.update(&txn).await?;
    let status = recompute_shipping_status(&txn, order_id).await?;
    txn.commit().await?;
    Ok(ShipmentChange { shipment, order_shipping_status: status })
}

#[instrument(skip(db, input))]
pub async fn create_shipment(db: &DatabaseConnection, order_id: i32, input: ShipmentInput) -> Result<ShipmentChange, ServiceError> {
    let order = get_order(db, order_id).await?;
    if order.shipping_status == ShippingStatus::ShippingNotRequired {
        return Err(ServiceError::validation("order does not require shipping"));
    }
    if input.total_weight.is_some_and(|w| !(w.is_finite() && w >= 0.0)) {
        return Err(ServiceError::validation("weight must not be negative"));
    }
    let am = shipment::ActiveModel {
        order_id: Set(order_id),
        tracking_number: Set(clean(input.tracking_number)),
        total_weight: Set(input.total_weight),
        shipped_date_utc: Set(None),
        delivery_date_utc: Set(None),
        created_on_utc: Set(Utc::now().into()),
        ..Default::default()
    };
    let txn = db.begin().await?;
    let shipment = am.insert(&txn).await?;
    let status = recompute_shipping_status(&txn, order_id).await?;
    txn.commit().await?;
    info!(shipment_id = shipment.id, order_id, "shipment created");
    Ok(ShipmentChange { shipment, order_shipping_status: status })
}

pub async fn update_tracking_number(db: &DatabaseConnection, id: i32, tracking_number: Option<String>) -> Result<ShipmentChange, ServiceError> {
    let current = get_shipment(db, id).await?;
    let order_id = current.order_id;
    let mut am: shipment::ActiveModel = current.into();
    am.tracking_number = Set(clean(tracking_number));
    update_and_recompute(db, am, order_id).await
}

pub async fn set_shipped(db: &DatabaseConnection, id: i32, at: Option<DateTime<FixedOffset>>) -> Result<ShipmentChange, ServiceError> {
    let current = get_shipment(db, id).await?;
    let at = at.unwrap_or_else(|| Utc::now().into());
    if let Some(delivered) = current.delivery_date_utc {
        if delivered < at {
            return Err(ServiceError::validation("shipped date must not be after the delivery date"));
        }
    }
    let order_id = current.order_id;
    let mut am: shipment::ActiveModel = current.into();
    am.shipped_date_utc = Set(Some(at));
    update_and_recompute(db, am, order_id).await
}

pub async fn set_delivered(db: &DatabaseConnection, id: i32, at: Option<DateTime<FixedOffset>>) -> Result<ShipmentChange, ServiceError> {
    let current = get_shipment(db, id).await?;
    let Some(shipped) = current.shipped_date_utc else {
        return Err(ServiceError::validation("shipment has not been shipped yet"));
    };
    let at = at.unwrap_or_else(|| Utc::now().into());
    if at < shipped {
        return Err(ServiceError::validation("delivery date must not be before the shipped date"));
    }
    let order_id = current.order_id;
    let mut am: shipment::ActiveModel = current.into();
    am.delivery_date_utc = Set(Some(at));
    update_and_recompute(db, am, order_id).await
}

pub async fn delete_shipment(db: &DatabaseConnection, id: i32) -> Result<ShippingStatus, ServiceError> {
    let current = get_shipment(db, id).await?;
    let txn = db.begin().await?;
    shipment::Entity::delete_by_id(id).exec(&txn).await?;
    let status = recompute_shipping_status(&txn, current.order_id).await?;
    txn.commit().await?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{create_customer, CustomerInput};
    use crate::sales::order::{create_order, OrderInput};
    use crate::test_support::{get_db, unique};
    use chrono::Duration;

    #[tokio::test]
    async fn status_follows_shipments() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let c = create_customer(&db, CustomerInput::email(&format!("{}@example.com", unique("ship")))).await?;
        let order = create_order(&db, OrderInput { customer_id: c.customer.id, order_total: 50.0, shipping_required: true }).await?;

        let a = create_shipment(&db, order.id, ShipmentInput { tracking_number: Some(" 1Z999 ".into()), ..Default::default() }).await?;
        assert_eq!(a.shipment.tracking_number.as_deref(), Some("1Z999"));
        assert_eq!(a.order_shipping_status, ShippingStatus::NotYetShipped);
        let b = create_shipment(&db, order.id, ShipmentInput::default()).await?;

        assert!(set_delivered(&db, a.shipment.id, None).await.is_err());
        let t0: DateTime<FixedOffset> = Utc::now().into();
        assert_eq!(set_shipped(&db, a.shipment.id, Some(t0)).await?.order_shipping_status, ShippingStatus::PartiallyShipped);
        assert_eq!(set_shipped(&db, b.shipment.id, Some(t0)).await?.order_shipping_status, ShippingStatus::Shipped);
        assert!(set_delivered(&db, a.shipment.id, Some(t0 - Duration::hours(1))).await.is_err());
        assert_eq!(set_delivered(&db, a.shipment.id, Some(t0 + Duration::days(1))).await?.order_shipping_status, ShippingStatus::Shipped);
        assert_eq!(delete_shipment(&db, b.shipment.id).await?, ShippingStatus::Delivered);

        let page = list_shipments(&db, &ShipmentFilter { tracking_number: Some("1Z9".into()), ..Default::default() }, &GridCommand::default()).await?;
        assert_eq!(page.total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn no_shipments_for_virtual_orders() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let c = create_customer(&db, CustomerInput::email(&format!("{}@example.com", unique("virt")))).await?;
        let order = create_order(&db, OrderInput { customer_id: c.customer.id, order_total: 9.0, shipping_required: false }).await?;
        assert!(create_shipment(&db, order.id, ShipmentInput::default()).await.is_err());
        Ok(())
    }
}
