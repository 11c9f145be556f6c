use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Back-office operator account.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admin_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub password_algorithm: String,
    pub active: bool,
    pub created_on_utc: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() { return Err(ModelError::Validation("name required".into())); }
    Ok(())
}

pub async fn create(
    db: &DatabaseConnection,
    email: &str,
    name: &str,
    password_hash: String,
    password_algorithm: &str,
) -> Result<Model, ModelError> {
    crate::customer::validate_email(email)?;
    validate_name(name)?;
    let am = ActiveModel {
        email: Set(email.trim().to_lowercase()),
        name: Set(name.trim().to_string()),
        password_hash: Set(password_hash),
        password_algorithm: Set(password_algorithm.to_string()),
        active: Set(true),
        created_on_utc: Set(Utc::now().into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}
