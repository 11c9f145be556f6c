use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub display_order: i32,
    pub published: bool,
    pub deleted: bool,
    pub subject_to_acl: bool,
    pub limited_to_stores: bool,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Name used for store mappings, ACL records and localized properties.
pub const ENTITY_NAME: &str = "Category";

pub fn validate_name(name: &str) -> Result<String, ModelError> {
    let name = name.trim();
    if name.is_empty() { return Err(ModelError::Validation("category name required".into())); }
    if name.chars().count() > 400 { return Err(ModelError::Validation("category name too long".into())); }
    Ok(name.to_string())
}
