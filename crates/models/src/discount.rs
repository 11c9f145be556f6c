use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(40))")]
pub enum DiscountType {
    #[sea_orm(string_value = "AssignedToOrderTotal")]
    AssignedToOrderTotal,
    #[sea_orm(string_value = "AssignedToSkus")]
    AssignedToSkus,
    #[sea_orm(string_value = "AssignedToCategories")]
    AssignedToCategories,
    #[sea_orm(string_value = "AssignedToManufacturers")]
    AssignedToManufacturers,
    #[sea_orm(string_value = "AssignedToShipping")]
    AssignedToShipping,
    #[sea_orm(string_value = "AssignedToOrderSubTotal")]
    AssignedToOrderSubTotal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
pub enum DiscountLimitation {
    #[sea_orm(string_value = "Unlimited")]
    Unlimited,
    #[sea_orm(string_value = "NTimesOnly")]
    NTimesOnly,
    #[sea_orm(string_value = "NTimesPerCustomer")]
    NTimesPerCustomer,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discount")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub discount_type: DiscountType,
    pub use_percentage: bool,
    pub discount_percentage: f64,
    pub discount_amount: f64,
    pub starts_on_utc: Option<DateTimeWithTimeZone>,
    pub ends_on_utc: Option<DateTimeWithTimeZone>,
    pub requires_coupon_code: bool,
    pub coupon_code: Option<String>,
    pub limitation: DiscountLimitation,
    pub limitation_times: i32,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
