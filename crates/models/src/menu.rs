use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub system_name: String,
    pub title: Option<String>,
    pub template: Option<String>,
    pub published: bool,
    pub is_system: bool,
    pub limited_to_stores: bool,
    pub subject_to_acl: bool,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::menu_item::Entity")]
    Items,
}

impl Related<super::menu_item::Entity> for Entity {
    fn to() -> RelationDef { Relation::Items.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub const ENTITY_NAME: &str = "Menu";

/// System names are non-empty and contain no whitespace.
pub fn validate_system_name(name: &str) -> Result<String, ModelError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ModelError::Validation("system name required".into()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ModelError::Validation("system name must not contain whitespace".into()));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_name_rules() {
        assert_eq!(validate_system_name(" Main ").unwrap(), "Main");
        assert!(validate_system_name("  ").is_err());
        assert!(validate_system_name("footer links").is_err());
    }
}
