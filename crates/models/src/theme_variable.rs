use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "theme_variable")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub theme: String,
    pub store_id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    let ok = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok { Ok(()) } else { Err(ModelError::Validation(format!("invalid variable name: {name}"))) }
}

#[cfg(test)]
mod tests {
    use super::validate_name;

    #[test]
    fn variable_names() {
        assert!(validate_name("brand-primary_2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("font size").is_err());
        assert!(validate_name("$x").is_err());
    }
}
