use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "store")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub url: String,
    pub ssl_enabled: bool,
    pub display_order: i32,
    pub primary_currency_id: Option<i32>,
    pub created_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { PrimaryCurrency }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::PrimaryCurrency => Entity::belongs_to(crate::currency::Entity)
                .from(Column::PrimaryCurrencyId)
                .to(crate::currency::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_url(url: &str) -> Result<(), ModelError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ModelError::Validation("store url must start with http(s)".into()));
    }
    Ok(())
}
