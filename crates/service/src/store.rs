//! Stores.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use models::{currency, store};

use crate::errors::ServiceError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreInput {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub primary_currency_id: Option<i32>,
}

#[cfg(test)]
impl StoreInput {
    pub fn named(name: &str, url: &str) -> Self {
        Self { name: name.into(), url: url.into(), ssl_enabled: true, display_order: 0, primary_currency_id: None }
    }
}

async fn validate(db: &DatabaseConnection, input: &StoreInput) -> Result<(), ServiceError> {
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("store name required"));
    }
    store::validate_url(&input.url)?;
    if let Some(cid) = input.primary_currency_id {
        let c = currency::Entity::find_by_id(cid)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::validation("primary currency does not exist"))?;
        if !c.published {
            return Err(ServiceError::validation("primary currency must be published"));
        }
    }
    Ok(())
}

pub async fn list_stores(db: &DatabaseConnection) -> Result<Vec<store::Model>, ServiceError> {
    Ok(store::Entity::find()
        .order_by_asc(store::Column::DisplayOrder)
        .order_by_asc(store::Column::Id)
        .all(db)
        .await?)
}

pub async fn get_store(db: &DatabaseConnection, id: i32) -> Result<store::Model, ServiceError> {
    store::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("store"))
}

pub async fn create_store(db: &DatabaseConnection, input: StoreInput) -> Result<store::Model, ServiceError> {
    validate(db, &input).await?;
    let am = store::ActiveModel {
        name: Set(input.name.trim().to_string()),
        url: Set(input.url.trim().to_string()),
        ssl_enabled: Set(input.ssl_enabled),
        display_order: Set(input.display_order),
        primary_currency_id: Set(input.primary_currency_id),
        created_on_utc: Set(Utc::now().into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn update_store(db: &DatabaseConnection, id: i32, input: StoreInput) -> Result<store::Model, ServiceError> {
    validate(db, &input).await?;
    let mut am: store::ActiveModel = get_store(db, id).await?.into();
    am.name = Set(input.name.trim().to_string());
    am.url = Set(input.url.trim().to_string());
    am.ssl_enabled = Set(input.ssl_enabled);
    am.display_order = Set(input.display_order);
    am.primary_currency_id = Set(input.primary_currency_id);
    Ok(am.update(db).await?)
}

/// The last remaining store cannot be deleted.
pub async fn delete_store(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    get_store(db, id).await?;
    if store::Entity::find().count(db).await? <= 1 {
        return Err(ServiceError::conflict("the last store cannot be deleted"));
    }
    store::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn last_store_is_kept() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        if std::env::var("DATABASE_URL").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let a = create_store(&db, StoreInput::named("Main", "https://shop.example.com")).await?;
        let b = create_store(&db, StoreInput::named("Outlet", "https://outlet.example.com")).await?;
        delete_store(&db, b.id).await?;
        let err = delete_store(&db, a.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_url_rejected() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let err = create_store(&db, StoreInput::named("Bad", "shop")).await.unwrap_err();
        assert!(err.is_client_error());
        Ok(())
    }
}
