use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "currency")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub currency_code: String,
    pub rate: f64,
    pub display_locale: Option<String>,
    pub custom_formatting: Option<String>,
    pub published: bool,
    pub display_order: i32,
    pub limited_to_stores: bool,
    pub created_on_utc: DateTimeWithTimeZone,
    pub updated_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Normalizes an ISO 4217 code to upper case.
pub fn validate_code(code: &str) -> Result<String, ModelError> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ModelError::Validation("currency code must be 3 letters".into()));
    }
    Ok(code.to_ascii_uppercase())
}

pub fn validate_rate(rate: f64) -> Result<(), ModelError> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(ModelError::Validation("currency rate must be greater than 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_upper_cased() {
        assert_eq!(validate_code(" eur ").unwrap(), "EUR");
        assert!(validate_code("EURO").is_err());
        assert!(validate_code("E1R").is_err());
    }

    #[test]
    fn rate_must_be_positive() {
        assert!(validate_rate(1.2).is_ok());
        assert!(validate_rate(0.0).is_err());
        assert!(validate_rate(f64::NAN).is_err());
    }
}
