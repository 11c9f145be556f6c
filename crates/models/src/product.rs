use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub sku: Option<String>,
    pub price: f64,
    pub published: bool,
    pub deleted: bool,
    pub stock_quantity: i32,
    pub manufacturer_id: Option<i32>,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Manufacturer }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Manufacturer => Entity::belongs_to(crate::manufacturer::Entity)
                .from(Column::ManufacturerId)
                .to(crate::manufacturer::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
