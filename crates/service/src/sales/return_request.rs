use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use models::return_request::{self, ReturnRequestStatus};

use super::order::get_order;
use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReturnRequestInput {
    pub order_id: i32,
    pub quantity: i32,
    pub reason_for_return: String,
    pub requested_action: String,
    #[serde(default)]
    pub customer_comments: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReturnRequestUpdate {
    pub status: ReturnRequestStatus,
    pub quantity: i32,
    #[serde(default)]
    pub staff_notes: Option<String>,
}

fn check_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::validation("quantity must be at least 1"));
    }
    Ok(())
}

pub async fn list_return_requests(
    db: &DatabaseConnection,
    status: Option<ReturnRequestStatus>,
    cmd: &GridCommand,
) -> Result<GridModel<return_request::Model>, ServiceError> {
    let mut q = return_request::Entity::find();
    if let Some(s) = status {
        q = q.filter(return_request::Column::Status.eq(s));
    }
    if cmd.sort.is_none() {
        q = q.order_by_desc(return_request::Column::CreatedOnUtc).order_by_desc(return_request::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_return_request(db: &DatabaseConnection, id: i32) -> Result<return_request::Model, ServiceError> {
    return_request::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("return request"))
}

/// Files a request against an order on behalf of its customer.
pub async fn create_return_request(db: &DatabaseConnection, input: ReturnRequestInput) -> Result<return_request::Model, ServiceError> {
    check_quantity(input.quantity)?;
    if input.reason_for_return.trim().is_empty() || input.requested_action.trim().is_empty() {
        return Err(ServiceError::validation("reason and requested action are required"));
    }
    let order = get_order(db, input.order_id).await?;
    let now = Utc::now();
    let am = return_request::ActiveModel {
        order_id: Set(order.id),
        customer_id: Set(order.customer_id),
        quantity: Set(input.quantity),
        reason_for_return: Set(input.reason_for_return.trim().to_string()),
        requested_action: Set(input.requested_action.trim().to_string()),
        customer_comments: Set(input.customer_comments),
        staff_notes: Set(None),
        status: Set(ReturnRequestStatus::Pending),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn update_return_request(db: &DatabaseConnection, id: i32, input: ReturnRequestUpdate) -> Result<return_request::Model, ServiceError> {
    check_quantity(input.quantity)?;
    let mut am: return_request::ActiveModel = get_return_request(db, id).await?.into();
    am.status = Set(input.status);
    am.quantity = Set(input.quantity);
    am.staff_notes = Set(input.staff_notes);
    am.updated_on_utc = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn delete_return_request(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let res = return_request::Entity::delete_by_id(id).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("return request"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{create_customer, CustomerInput};
    use crate::sales::order::{create_order, OrderInput};
    use crate::test_support::{get_db, unique};

    #[tokio::test]
    async fn status_flow() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let c = create_customer(&db, CustomerInput::email(&format!("{}@example.com", unique("rr")))).await?;
        let order = create_order(&db, OrderInput { customer_id: c.customer.id, order_total: 20.0, shipping_required: true }).await?;
        let input = ReturnRequestInput {
            order_id: order.id,
            quantity: 0,
            reason_for_return: "Broken".into(),
            requested_action: "Refund".into(),
            customer_comments: None,
        };
        assert!(create_return_request(&db, input.clone()).await.is_err());
        let rr = create_return_request(&db, ReturnRequestInput { quantity: 1, ..input }).await?;
        assert_eq!(rr.customer_id, c.customer.id);

        let upd = update_return_request(&db, rr.id, ReturnRequestUpdate {
            status: ReturnRequestStatus::ItemsRefunded,
            quantity: 1,
            staff_notes: Some("refunded".into()),
        })
        .await?;
        assert_eq!(upd.status, ReturnRequestStatus::ItemsRefunded);

        let refunded = list_return_requests(&db, Some(ReturnRequestStatus::ItemsRefunded), &GridCommand::default()).await?;
        assert!(refunded.rows.iter().any(|r| r.id == rr.id));
        let pending = list_return_requests(&db, Some(ReturnRequestStatus::Pending), &GridCommand::default()).await?;
        assert!(!pending.rows.iter().any(|r| r.id == rr.id));

        delete_return_request(&db, rr.id).await?;
        assert!(delete_return_request(&db, rr.id).await.is_err());
        Ok(())
    }
}
