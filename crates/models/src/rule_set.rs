use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum RuleScope {
    #[sea_orm(string_value = "Cart")]
    Cart,
    #[sea_orm(string_value = "Customer")]
    Customer,
    #[sea_orm(string_value = "Product")]
    Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(5))")]
pub enum LogicalOperator {
    #[sea_orm(string_value = "And")]
    And,
    #[sea_orm(string_value = "Or")]
    Or,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rule_set")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub scope: RuleScope,
    pub is_active: bool,
    pub is_sub_group: bool,
    pub logical_operator: LogicalOperator,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rule::Entity")]
    Rules,
}

impl Related<super::rule::Entity> for Entity {
    fn to() -> RelationDef { Relation::Rules.def() }
}

impl ActiveModelBehavior for ActiveModel {}
