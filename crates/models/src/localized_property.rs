use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One translated value of one field of one entity.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "localized_property")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entity_id: i32,
    pub language_id: i32,
    pub locale_key_group: String,
    pub locale_key: String,
    #[sea_orm(column_type = "Text")]
    pub locale_value: String,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Language }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Language => Entity::belongs_to(crate::language::Entity)
                .from(Column::LanguageId)
                .to(crate::language::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
