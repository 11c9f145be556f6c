use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum ImportFileType {
    #[sea_orm(string_value = "Csv")]
    Csv,
    #[sea_orm(string_value = "Xlsx")]
    Xlsx,
}

impl ImportFileType {
    pub fn extension(self) -> &'static str {
        match self {
            ImportFileType::Csv => "csv",
            ImportFileType::Xlsx => "xlsx",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(40))")]
pub enum ImportEntityType {
    #[sea_orm(string_value = "Product")]
    Product,
    #[sea_orm(string_value = "Category")]
    Category,
    #[sea_orm(string_value = "Customer")]
    Customer,
    #[sea_orm(string_value = "NewsletterSubscription")]
    NewsletterSubscription,
}

impl ImportEntityType {
    /// Importable properties per entity type.
    pub fn properties(self) -> &'static [&'static str] {
        match self {
            ImportEntityType::Product => &[
                "Id", "Name", "Sku", "Price", "Published", "StockQuantity", "ManufacturerId", "CategoryIds",
            ],
            ImportEntityType::Category => &[
                "Id", "Name", "Description", "ParentId", "DisplayOrder", "Published",
            ],
            ImportEntityType::Customer => &[
                "Id", "Email", "Username", "Active", "IsTaxExempt", "BillingCountryId", "CustomerRoleIds",
            ],
            ImportEntityType::NewsletterSubscription => &["Email", "Active", "StoreId"],
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_profile")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub folder_name: String,
    pub file_type: ImportFileType,
    pub entity_type: ImportEntityType,
    pub enabled: bool,
    pub skip: i32,
    pub take: i32,
    pub key_field_names: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub column_mapping: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub result_info: Option<String>,
    pub schedule_task_id: i32,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
