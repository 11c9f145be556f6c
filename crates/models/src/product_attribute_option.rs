use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_attribute_option")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_attribute_id: i32,
    pub name: String,
    pub alias: Option<String>,
    pub price_adjustment: f64,
    pub weight_adjustment: f64,
    pub is_preselected: bool,
    pub display_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Attribute }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Attribute => Entity::belongs_to(crate::product_attribute::Entity)
                .from(Column::ProductAttributeId)
                .to(crate::product_attribute::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
