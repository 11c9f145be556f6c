use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use models::{currency, store};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::mapping;

pub const ENTITY_NAME: &str = "Currency";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CurrencyInput {
    pub name: String,
    pub currency_code: String,
    pub rate: f64,
    #[serde(default)]
    pub display_locale: Option<String>,
    #[serde(default)]
    pub custom_formatting: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub store_ids: Vec<i32>,
}

#[cfg(test)]
impl CurrencyInput {
    pub fn code(code: &str, rate: f64) -> Self {
        Self { name: code.into(), currency_code: code.into(), rate, published: true, ..Default::default() }
    }
}

async fn validate(db: &DatabaseConnection, input: &CurrencyInput, except: Option<i32>) -> Result<String, ServiceError> {
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("currency name required"));
    }
    let code = currency::validate_code(&input.currency_code)?;
    currency::validate_rate(input.rate)?;
    let mut q = currency::Entity::find().filter(currency::Column::CurrencyCode.eq(code.as_str()));
    if let Some(id) = except {
        q = q.filter(currency::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("currency {code} already exists")));
    }
    Ok(code)
}

async fn primary_of_stores(db: &DatabaseConnection, id: i32) -> Result<Vec<String>, ServiceError> {
    Ok(store::Entity::find()
        .filter(store::Column::PrimaryCurrencyId.eq(id))
        .all(db)
        .await?
        .into_iter()
        .map(|s| s.name)
        .collect())
}

pub async fn list_currencies(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<currency::Model>, ServiceError> {
    let mut q = currency::Entity::find();
    if let Some(term) = cmd.search_term() {
        q = q.filter(currency::Column::Name.contains(term).or(currency::Column::CurrencyCode.eq(term.to_ascii_uppercase())));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(currency::Column::DisplayOrder).order_by_asc(currency::Column::CurrencyCode);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_currency(db: &DatabaseConnection, id: i32) -> Result<currency::Model, ServiceError> {
    currency::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("currency"))
}

#[instrument(skip(db, input), fields(code = %input.currency_code))]
pub async fn create_currency(db: &DatabaseConnection, input: CurrencyInput) -> Result<currency::Model, ServiceError> {
    let code = validate(db, &input, None).await?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let created = currency::ActiveModel {
        name: Set(input.name.trim().to_string()),
        currency_code: Set(code),
        rate: Set(input.rate),
        display_locale: Set(input.display_locale),
        custom_formatting: Set(input.custom_formatting),
        published: Set(input.published),
        display_order: Set(input.display_order),
        limited_to_stores: Set(false),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let created = if mapping::save_store_mappings(&txn, ENTITY_NAME, created.id, &input.store_ids).await? {
        let mut am: currency::ActiveModel = created.into();
        am.limited_to_stores = Set(true);
        am.update(&txn).await?
    } else {
        created
    };
    txn.commit().await?;
    Ok(created)
}

pub async fn update_currency(db: &DatabaseConnection, id: i32, input: CurrencyInput) -> Result<currency::Model, ServiceError> {
    let current = get_currency(db, id).await?;
    let code = validate(db, &input, Some(id)).await?;
    if current.published && !input.published {
        let stores = primary_of_stores(db, id).await?;
        if !stores.is_empty() {
            return Err(ServiceError::conflict(format!(
                "currency is the primary currency of {}; it cannot be unpublished",
                stores.join(", ")
            )));
        }
    }
    let txn = db.begin().await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, id, &input.store_ids).await?;
    let mut am: currency::ActiveModel = current.into();
    am.name = Set(input.name.trim().to_string());
    am.currency_code = Set(code);
    am.rate = Set(input.rate);
    am.display_locale = Set(input.display_locale);
    am.custom_formatting = Set(input.custom_formatting);
    am.published = Set(input.published);
    am.display_order = Set(input.display_order);
    am.limited_to_stores = Set(limited);
    am.updated_on_utc = Set(Utc::now().into());
    let updated = am.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

pub async fn delete_currency(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    get_currency(db, id).await?;
    let stores = primary_of_stores(db, id).await?;
    if !stores.is_empty() {
        return Err(ServiceError::conflict(format!(
            "currency is the primary currency of {}; it cannot be deleted",
            stores.join(", ")
        )));
    }
    let txn = db.begin().await?;
    mapping::delete_store_mappings(&txn, ENTITY_NAME, id).await?;
    currency::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Bulk-updates exchange rates keyed by currency code. Unknown codes are ignored.
#[instrument(skip_all, fields(count = rates.len()))]
pub async fn apply_rates(db: &DatabaseConnection, rates: &HashMap<String, f64>) -> Result<usize, ServiceError> {
    for rate in rates.values() {
        currency::validate_rate(*rate)?;
    }
    let wanted: HashMap<String, f64> = rates.iter().map(|(k, v)| (k.trim().to_ascii_uppercase(), *v)).collect();
    let existing = currency::Entity::find()
        .filter(currency::Column::CurrencyCode.is_in(wanted.keys().cloned()))
        .all(db)
        .await?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let mut updated = 0;
    for c in existing {
        if let Some(rate) = wanted.get(&c.currency_code) {
            let mut am: currency::ActiveModel = c.into();
            am.rate = Set(*rate);
            am.updated_on_utc = Set(now.into());
            am.update(&txn).await?;
            updated += 1;
        }
    }
    txn.commit().await?;
    info!(updated, "applied currency rates");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{create_store, StoreInput};
    use crate::test_support::get_db;

    #[tokio::test]
    async fn code_unique_and_rate_positive() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let usd = create_currency(&db, CurrencyInput::code("usd", 1.0)).await?;
        assert_eq!(usd.currency_code, "USD");
        assert!(matches!(create_currency(&db, CurrencyInput::code("USD", 1.0)).await.unwrap_err(), ServiceError::Conflict(_)));
        assert!(create_currency(&db, CurrencyInput::code("GBP", 0.0)).await.is_err());

        create_currency(&db, CurrencyInput::code("EUR", 0.9)).await?;
        let rates = HashMap::from([("eur".to_string(), 0.95), ("XYZ".to_string(), 2.0)]);
        assert_eq!(apply_rates(&db, &rates).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn primary_currency_is_protected() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let chf = create_currency(&db, CurrencyInput::code("CHF", 1.1)).await?;
        let mut input = StoreInput::named("Swiss", "https://shop.example.ch");
        input.primary_currency_id = Some(chf.id);
        create_store(&db, input).await?;

        assert!(matches!(delete_currency(&db, chf.id).await.unwrap_err(), ServiceError::Conflict(_)));
        let mut unpublish = CurrencyInput::code("CHF", 1.1);
        unpublish.published = false;
        assert!(matches!(update_currency(&db, chf.id, unpublish).await.unwrap_err(), ServiceError::Conflict(_)));
        Ok(())
    }
}
