use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum CyclePeriod {
    #[sea_orm(string_value = "Days")]
    Days,
    #[sea_orm(string_value = "Weeks")]
    Weeks,
    #[sea_orm(string_value = "Months")]
    Months,
    #[sea_orm(string_value = "Years")]
    Years,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_payment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub initial_order_id: i32,
    pub cycle_length: i32,
    pub cycle_period: CyclePeriod,
    /// 0 means unlimited.
    pub total_cycles: i32,
    pub start_date_utc: DateTimeWithTimeZone,
    pub is_active: bool,
    pub deleted: bool,
    pub created_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recurring_payment_history::Entity")]
    History,
}

impl Related<super::recurring_payment_history::Entity> for Entity {
    fn to() -> RelationDef { Relation::History.def() }
}

impl ActiveModelBehavior for ActiveModel {}
