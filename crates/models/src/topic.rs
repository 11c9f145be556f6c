use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "topic")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub system_name: String,
    pub title: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub body: Option<String>,
    pub include_in_sitemap: bool,
    pub is_password_protected: bool,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub is_published: bool,
    pub is_system: bool,
    pub limited_to_stores: bool,
    pub subject_to_acl: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub const ENTITY_NAME: &str = "Topic";

/// Trims and replaces inner whitespace runs with `_`.
pub fn normalize_system_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    #[test]
    fn normalizes_whitespace() {
        assert_eq!(super::normalize_system_name("  About   us page "), "About_us_page");
        assert_eq!(super::normalize_system_name("Imprint"), "Imprint");
    }
}
