use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Export providers that can be bound to a profile.
pub const PROVIDERS: &[&str] = &["ProductCsv", "CustomerCsv", "OrderXml", "CategoryXml"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "export_profile")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub folder_name: String,
    pub provider_system_name: String,
    pub enabled: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub filtering: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub projection: Option<String>,
    pub file_name_pattern: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub result_info: Option<String>,
    pub schedule_task_id: i32,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
