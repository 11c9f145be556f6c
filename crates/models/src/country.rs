use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "country")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub allows_billing: bool,
    pub allows_shipping: bool,
    pub two_letter_iso_code: String,
    pub three_letter_iso_code: String,
    pub numeric_iso_code: i32,
    pub subject_to_vat: bool,
    pub published: bool,
    pub display_order: i32,
    pub limited_to_stores: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Checks an ISO 3166 letter code of the given length and returns it upper-cased.
pub fn validate_iso(code: &str, len: usize) -> Result<String, ModelError> {
    let code = code.trim();
    if code.len() != len || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ModelError::Validation(format!("ISO code must be {len} letters")));
    }
    Ok(code.to_ascii_uppercase())
}
