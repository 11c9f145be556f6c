//! Languages and per-entity localized property values.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use models::{language, localized_property};

use crate::errors::ServiceError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedValue {
    pub language_id: i32,
    pub key: String,
    pub value: String,
}

impl LocalizedValue {
    pub fn new(language_id: i32, key: &str, value: &str) -> Self {
        Self { language_id, key: key.to_string(), value: value.to_string() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LanguageInput {
    pub name: String,
    pub culture: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn validate_language(input: &LanguageInput) -> Result<(String, String), ServiceError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("language name required"));
    }
    let culture = input.culture.trim();
    let ok = culture.len() >= 2
        && culture.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !ok {
        return Err(ServiceError::validation(format!("invalid culture: {}", input.culture)));
    }
    Ok((name.to_string(), culture.to_string()))
}

async fn ensure_culture_free(db: &DatabaseConnection, culture: &str, except: Option<i32>) -> Result<(), ServiceError> {
    let mut q = language::Entity::find().filter(language::Column::Culture.eq(culture));
    if let Some(id) = except {
        q = q.filter(language::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("culture {culture} already exists")));
    }
    Ok(())
}

pub async fn list_languages(db: &DatabaseConnection) -> Result<Vec<language::Model>, ServiceError> {
    Ok(language::Entity::find()
        .order_by_asc(language::Column::DisplayOrder)
        .order_by_asc(language::Column::Id)
        .all(db)
        .await?)
}

pub async fn create_language(db: &DatabaseConnection, input: LanguageInput) -> Result<language::Model, ServiceError> {
    let (name, culture) = validate_language(&input)?;
    ensure_culture_free(db, &culture, None).await?;
    let am = language::ActiveModel {
        name: Set(name),
        culture: Set(culture),
        published: Set(input.published),
        display_order: Set(input.display_order),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn update_language(db: &DatabaseConnection, id: i32, input: LanguageInput) -> Result<language::Model, ServiceError> {
    let (name, culture) = validate_language(&input)?;
    let mut am: language::ActiveModel = language::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("language"))?
        .into();
    ensure_culture_free(db, &culture, Some(id)).await?;
    am.name = Set(name);
    am.culture = Set(culture);
    am.published = Set(input.published);
    am.display_order = Set(input.display_order);
    Ok(am.update(db).await?)
}

/// Deletes a language and every localized value stored for it.
pub async fn delete_language(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    if language::Entity::find().count(db).await? <= 1 {
        return Err(ServiceError::conflict("at least one language must remain"));
    }
    localized_property::Entity::delete_many()
        .filter(localized_property::Column::LanguageId.eq(id))
        .exec(db)
        .await?;
    let res = language::Entity::delete_by_id(id).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("language"));
    }
    Ok(())
}

/// Upsert localized values of one entity. A blank value removes the stored row.
pub async fn save_localized<C: ConnectionTrait>(
    db: &C,
    key_group: &str,
    entity_id: i32,
    values: &[LocalizedValue],
) -> Result<(), ServiceError> {
    for v in values {
        let existing = localized_property::Entity::find()
            .filter(localized_property::Column::EntityId.eq(entity_id))
            .filter(localized_property::Column::LocaleKeyGroup.eq(key_group))
            .filter(localized_property::Column::LocaleKey.eq(v.key.as_str()))
            .filter(localized_property::Column::LanguageId.eq(v.language_id))
            .one(db)
            .await?;
        let value = v.value.trim();
        match (existing, value.is_empty()) {
            (Some(row), true) => {
                localized_property::Entity::delete_by_id(row.id).exec(db).await?;
            }
            (None, true) => {}
            (Some(row), false) => {
                if row.locale_value != value {
                    let mut am: localized_property::ActiveModel = row.into();
                    am.locale_value = Set(value.to_string());
                    am.update(db).await?;
                }
            }
            (None, false) => {
                localized_property::ActiveModel {
                    entity_id: Set(entity_id),
                    language_id: Set(v.language_id),
                    locale_key_group: Set(key_group.to_string()),
                    locale_key: Set(v.key.clone()),
                    locale_value: Set(value.to_string()),
                    ..Default::default()
                }
                .insert(db)
                .await?;
            }
        }
    }
    Ok(())
}

pub async fn get_localized<C: ConnectionTrait>(
    db: &C,
    key_group: &str,
    entity_id: i32,
) -> Result<Vec<LocalizedValue>, ServiceError> {
    let rows = localized_property::Entity::find()
        .filter(localized_property::Column::EntityId.eq(entity_id))
        .filter(localized_property::Column::LocaleKeyGroup.eq(key_group))
        .order_by_asc(localized_property::Column::LanguageId)
        .order_by_asc(localized_property::Column::LocaleKey)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|r| LocalizedValue { language_id: r.language_id, key: r.locale_key, value: r.locale_value })
        .collect())
}

pub async fn delete_localized<C: ConnectionTrait>(db: &C, key_group: &str, entity_id: i32) -> Result<u64, ServiceError> {
    let res = localized_property::Entity::delete_many()
        .filter(localized_property::Column::EntityId.eq(entity_id))
        .filter(localized_property::Column::LocaleKeyGroup.eq(key_group))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, unique};

    #[tokio::test]
    async fn localized_values_upsert_and_blank_delete() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let culture = unique("de").replace('_', "-");
        let lang = create_language(&db, LanguageInput { name: "Deutsch".into(), culture, published: true, display_order: 1 }).await?;

        save_localized(&db, "Category", 10, &[LocalizedValue::new(lang.id, "Name", "Schuhe")]).await?;
        save_localized(&db, "Category", 10, &[LocalizedValue::new(lang.id, "Name", "Stiefel")]).await?;
        let vals = get_localized(&db, "Category", 10).await?;
        assert_eq!(vals, vec![LocalizedValue::new(lang.id, "Name", "Stiefel")]);

        save_localized(&db, "Category", 10, &[LocalizedValue::new(lang.id, "Name", "   ")]).await?;
        assert!(get_localized(&db, "Category", 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_culture_is_conflict() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let culture = unique("fr").replace('_', "-");
        create_language(&db, LanguageInput { name: "Français".into(), culture: culture.clone(), published: true, display_order: 0 }).await?;
        let err = create_language(&db, LanguageInput { name: "Other".into(), culture, published: true, display_order: 0 }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        Ok(())
    }
}
