//! Per-store theme variable overrides.

use std::collections::{BTreeMap, HashMap};

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use tracing::info;

use models::{store, theme_variable};

use crate::errors::ServiceError;

fn check_theme(theme: &str) -> Result<&str, ServiceError> {
    let theme = theme.trim();
    if theme.is_empty() {
        return Err(ServiceError::validation("theme name required"));
    }
    Ok(theme)
}

pub async fn get_variables(db: &DatabaseConnection, theme: &str, store_id: i32) -> Result<BTreeMap<String, String>, ServiceError> {
    let theme = check_theme(theme)?;
    Ok(theme_variable::Entity::find()
        .filter(theme_variable::Column::Theme.eq(theme))
        .filter(theme_variable::Column::StoreId.eq(store_id))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.name, v.value))
        .collect())
}

/// Upserts the given variables. An empty value removes the override.
pub async fn save_variables(
    db: &DatabaseConnection,
    theme: &str,
    store_id: i32,
    values: &HashMap<String, String>,
) -> Result<usize, ServiceError> {
    let theme = check_theme(theme)?;
    for name in values.keys() {
        theme_variable::validate_name(name)?;
    }
    store::Entity::find_by_id(store_id).one(db).await?.ok_or_else(|| ServiceError::not_found("store"))?;

    let existing: HashMap<String, theme_variable::Model> = theme_variable::Entity::find()
        .filter(theme_variable::Column::Theme.eq(theme))
        .filter(theme_variable::Column::StoreId.eq(store_id))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.name.clone(), v))
        .collect();

    let txn = db.begin().await?;
    let mut changed = 0;
    for (name, value) in values {
        let value = value.trim();
        match (existing.get(name), value.is_empty()) {
            (Some(row), true) => {
                theme_variable::Entity::delete_by_id(row.id).exec(&txn).await?;
                changed += 1;
            }
            (Some(row), false) if row.value != value => {
                let mut am: theme_variable::ActiveModel = row.clone().into();
                am.value = Set(value.to_string());
                am.update(&txn).await?;
                changed += 1;
            }
            (None, false) => {
                theme_variable::ActiveModel {
                    theme: Set(theme.to_string()),
                    store_id: Set(store_id),
                    name: Set(name.clone()),
                    value: Set(value.to_string()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                changed += 1;
            }
            _ => {}
        }
    }
    txn.commit().await?;
    info!(theme, store_id, changed, "saved theme variables");
    Ok(changed)
}

pub async fn reset_variables(db: &DatabaseConnection, theme: &str, store_id: i32) -> Result<u64, ServiceError> {
    let theme = check_theme(theme)?;
    let res = theme_variable::Entity::delete_many()
        .filter(theme_variable::Column::Theme.eq(theme))
        .filter(theme_variable::Column::StoreId.eq(store_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{create_store, StoreInput};
    use crate::test_support::get_db;

    #[tokio::test]
    async fn upsert_delete_and_reset() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let store = create_store(&db, StoreInput::named("Main", "https://example.com")).await?;

        let first = HashMap::from([("brand-primary".to_string(), "#0af".to_string()), ("radius".to_string(), "4px".to_string())]);
        assert_eq!(save_variables(&db, "Flex", store.id, &first).await?, 2);

        let second = HashMap::from([("brand-primary".to_string(), "#f00".to_string()), ("radius".to_string(), "".to_string())]);
        assert_eq!(save_variables(&db, "Flex", store.id, &second).await?, 2);
        let vars = get_variables(&db, "Flex", store.id).await?;
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["brand-primary"], "#f00");

        let bad = HashMap::from([("font size".to_string(), "12px".to_string())]);
        assert!(save_variables(&db, "Flex", store.id, &bad).await.is_err());

        assert_eq!(reset_variables(&db, "Flex", store.id).await?, 1);
        assert!(get_variables(&db, "Flex", store.id).await?.is_empty());
        Ok(())
    }
}
