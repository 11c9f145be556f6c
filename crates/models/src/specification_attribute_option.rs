use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "specification_attribute_option")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub specification_attribute_id: i32,
    pub name: String,
    pub alias: Option<String>,
    pub display_order: i32,
    pub color_rgb: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Attribute }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Attribute => Entity::belongs_to(crate::specification_attribute::Entity)
                .from(Column::SpecificationAttributeId)
                .to(crate::specification_attribute::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
