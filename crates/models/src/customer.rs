use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub email: String,
    pub username: Option<String>,
    pub active: bool,
    pub deleted: bool,
    pub is_tax_exempt: bool,
    pub billing_country_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub admin_comment: Option<String>,
    pub created_on_utc: DateTimeWithTimeZone,
    pub last_activity_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { BillingCountry }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::BillingCountry => Entity::belongs_to(crate::country::Entity)
                .from(Column::BillingCountryId)
                .to(crate::country::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ModelError::Validation("invalid email".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::validate_email;

    #[test]
    fn email_needs_local_part_and_domain() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("jane@localhost").is_err());
        assert!(validate_email("jane").is_err());
    }
}
