use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_payment_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub recurring_payment_id: i32,
    pub order_id: Option<i32>,
    pub created_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recurring_payment::Entity",
        from = "Column::RecurringPaymentId",
        to = "super::recurring_payment::Column::Id",
        on_delete = "Cascade"
    )]
    RecurringPayment,
}

impl Related<super::recurring_payment::Entity> for Entity {
    fn to() -> RelationDef { Relation::RecurringPayment.def() }
}

impl ActiveModelBehavior for ActiveModel {}
