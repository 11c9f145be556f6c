use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use models::order::{self, OrderStatus, ShippingStatus};
use models::{customer, shipment};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderInput {
    pub customer_id: i32,
    pub order_total: f64,
    #[serde(default = "default_true")]
    pub shipping_required: bool,
}

fn default_true() -> bool { true }

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub customer_id: Option<i32>,
    #[serde(default)]
    pub order_status: Option<OrderStatus>,
}

/// Shipping status implied by an order's shipments.
pub fn shipping_status_of(shipments: &[shipment::Model]) -> ShippingStatus {
    if shipments.is_empty() {
        return ShippingStatus::NotYetShipped;
    }
    let shipped = shipments.iter().filter(|s| s.shipped_date_utc.is_some()).count();
    let delivered = shipments.iter().filter(|s| s.delivery_date_utc.is_some()).count();
    if delivered == shipments.len() {
        ShippingStatus::Delivered
    } else if shipped == shipments.len() {
        ShippingStatus::Shipped
    } else if shipped > 0 {
        ShippingStatus::PartiallyShipped
    } else {
        ShippingStatus::NotYetShipped
    }
}

/// Writes the shipping status derived from the current shipments.
/// Orders that need no shipping are left untouched.
pub async fn recompute_shipping_status<C: ConnectionTrait>(db: &C, order_id: i32) -> Result<ShippingStatus, ServiceError> {
    let order = order::Entity::find_by_id(order_id).one(db).await?.ok_or_else(|| ServiceError::not_found("order"))?;
    if order.shipping_status == ShippingStatus::ShippingNotRequired {
        return Ok(order.shipping_status);
    }
    let shipments = shipment::Entity::find().filter(shipment::Column::OrderId.eq(order_id)).all(db).await?;
    let status = shipping_status_of(&shipments);
    if status != order.shipping_status {
        debug!(order_id, ?status, "shipping status changed");
        let mut am: order::ActiveModel = order.into();
        am.shipping_status = Set(status);
        am.update(db).await?;
    }
    Ok(status)
}

pub async fn list_orders(db: &DatabaseConnection, filter: &OrderFilter, cmd: &GridCommand) -> Result<GridModel<order::Model>, ServiceError> {
    let mut q = order::Entity::find();
    if let Some(c) = filter.customer_id {
        q = q.filter(order::Column::CustomerId.eq(c));
    }
    if let Some(s) = filter.order_status {
        q = q.filter(order::Column::OrderStatus.eq(s));
    }
    if cmd.sort.is_none() {
        q = q.order_by_desc(order::Column::CreatedOnUtc).order_by_desc(order::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_order(db: &DatabaseConnection, id: i32) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("order"))
}

pub async fn create_order(db: &DatabaseConnection, input: OrderInput) -> Result<order::Model, ServiceError> {
    if !(input.order_total.is_finite() && input.order_total >= 0.0) {
        return Err(ServiceError::validation("order total must not be negative"));
    }
    customer::Entity::find_by_id(input.customer_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::validation("customer does not exist"))?;
    let am = order::ActiveModel {
        customer_id: Set(input.customer_id),
        order_total: Set(input.order_total),
        order_status: Set(OrderStatus::Pending),
        shipping_status: Set(if input.shipping_required { ShippingStatus::NotYetShipped } else { ShippingStatus::ShippingNotRequired }),
        created_on_utc: Set(Utc::now().into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(shipped: bool, delivered: bool) -> shipment::Model {
        let now = Utc::now().into();
        shipment::Model {
            id: 0,
            order_id: 1,
            tracking_number: None,
            total_weight: None,
            shipped_date_utc: shipped.then_some(now),
            delivery_date_utc: delivered.then_some(now),
            created_on_utc: now,
        }
    }

    #[test]
    fn status_from_shipments() {
        assert_eq!(shipping_status_of(&[]), ShippingStatus::NotYetShipped);
        assert_eq!(shipping_status_of(&[s(false, false)]), ShippingStatus::NotYetShipped);
        assert_eq!(shipping_status_of(&[s(true, false), s(false, false)]), ShippingStatus::PartiallyShipped);
        assert_eq!(shipping_status_of(&[s(true, false), s(true, true)]), ShippingStatus::Shipped);
        assert_eq!(shipping_status_of(&[s(true, true), s(true, true)]), ShippingStatus::Delivered);
    }
}
