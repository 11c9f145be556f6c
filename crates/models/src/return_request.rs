use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
pub enum ReturnRequestStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Received")]
    Received,
    #[sea_orm(string_value = "ReturnAuthorized")]
    ReturnAuthorized,
    #[sea_orm(string_value = "ItemsRepaired")]
    ItemsRepaired,
    #[sea_orm(string_value = "ItemsRefunded")]
    ItemsRefunded,
    #[sea_orm(string_value = "RequestRejected")]
    RequestRejected,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "return_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: i32,
    pub customer_id: i32,
    pub quantity: i32,
    pub reason_for_return: String,
    pub requested_action: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub customer_comments: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub staff_notes: Option<String>,
    pub status: ReturnRequestStatus,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
