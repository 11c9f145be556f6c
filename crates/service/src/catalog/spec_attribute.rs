//! Specification attributes and their options.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use models::specification_attribute::{self as attribute, ENTITY_NAME};
use models::specification_attribute_option as option;

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::localization::{self, LocalizedValue};

const OPTION_KEY_GROUP: &str = "SpecificationAttributeOption";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpecAttributeInput {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub allow_filtering: bool,
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpecOptionInput {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub color_rgb: Option<String>,
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpecAttributeDetails {
    #[serde(flatten)]
    pub attribute: attribute::Model,
    pub locales: Vec<LocalizedValue>,
    pub options: Vec<option::Model>,
}

fn clean(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required_name(name: &str, what: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation(format!("{what} name required")));
    }
    Ok(name.to_string())
}

fn validate_color(color: &Option<String>) -> Result<(), ServiceError> {
    if let Some(c) = color {
        let hex = c.strip_prefix('#').unwrap_or(c);
        if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(ServiceError::validation(format!("invalid color: {c}")));
        }
    }
    Ok(())
}

pub async fn list_attributes(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<attribute::Model>, ServiceError> {
    let mut q = attribute::Entity::find();
    if let Some(term) = cmd.search_term() {
        q = q.filter(attribute::Column::Name.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(attribute::Column::DisplayOrder).order_by_asc(attribute::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_attribute(db: &DatabaseConnection, id: i32) -> Result<SpecAttributeDetails, ServiceError> {
    let attribute = attribute::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("specification attribute"))?;
    Ok(SpecAttributeDetails {
        locales: localization::get_localized(db, ENTITY_NAME, id).await?,
        options: list_options(db, id).await?,
        attribute,
    })
}

pub async fn create_attribute(db: &DatabaseConnection, input: SpecAttributeInput) -> Result<SpecAttributeDetails, ServiceError> {
    let name = required_name(&input.name, "attribute")?;
    let txn = db.begin().await?;
    let created = attribute::ActiveModel {
        name: Set(name),
        alias: Set(clean(input.alias)),
        display_order: Set(input.display_order),
        allow_filtering: Set(input.allow_filtering),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, ENTITY_NAME, created.id, &input.locales).await?;
    txn.commit().await?;
    get_attribute(db, created.id).await
}

pub async fn update_attribute(db: &DatabaseConnection, id: i32, input: SpecAttributeInput) -> Result<SpecAttributeDetails, ServiceError> {
    let name = required_name(&input.name, "attribute")?;
    let current = get_attribute(db, id).await?.attribute;
    let txn = db.begin().await?;
    let mut am: attribute::ActiveModel = current.into();
    am.name = Set(name);
    am.alias = Set(clean(input.alias));
    am.display_order = Set(input.display_order);
    am.allow_filtering = Set(input.allow_filtering);
    am.update(&txn).await?;
    localization::save_localized(&txn, ENTITY_NAME, id, &input.locales).await?;
    txn.commit().await?;
    get_attribute(db, id).await
}

/// Deletes the attribute together with its options and their localized values.
pub async fn delete_attribute(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let options = list_options(db, id).await?;
    let txn = db.begin().await?;
    for o in &options {
        localization::delete_localized(&txn, OPTION_KEY_GROUP, o.id).await?;
    }
    option::Entity::delete_many()
        .filter(option::Column::SpecificationAttributeId.eq(id))
        .exec(&txn)
        .await?;
    localization::delete_localized(&txn, ENTITY_NAME, id).await?;
    let res = attribute::Entity::delete_by_id(id).exec(&txn).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("specification attribute"));
    }
    txn.commit().await?;
    Ok(())
}

pub async fn list_options(db: &DatabaseConnection, attribute_id: i32) -> Result<Vec<option::Model>, ServiceError> {
    Ok(option::Entity::find()
        .filter(option::Column::SpecificationAttributeId.eq(attribute_id))
        .order_by_asc(option::Column::DisplayOrder)
        .order_by_asc(option::Column::Id)
        .all(db)
        .await?)
}

async fn ensure_option_name_free(db: &DatabaseConnection, attribute_id: i32, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
    let mut q = option::Entity::find()
        .filter(option::Column::SpecificationAttributeId.eq(attribute_id))
        .filter(option::Column::Name.eq(name));
    if let Some(id) = except {
        q = q.filter(option::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("option {name} already exists")));
    }
    Ok(())
}

pub async fn create_option(db: &DatabaseConnection, attribute_id: i32, input: SpecOptionInput) -> Result<option::Model, ServiceError> {
    let name = required_name(&input.name, "option")?;
    validate_color(&input.color_rgb)?;
    get_attribute(db, attribute_id).await?;
    ensure_option_name_free(db, attribute_id, &name, None).await?;
    let txn = db.begin().await?;
    let created = option::ActiveModel {
        specification_attribute_id: Set(attribute_id),
        name: Set(name),
        alias: Set(clean(input.alias)),
        display_order: Set(input.display_order),
        color_rgb: Set(clean(input.color_rgb)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, OPTION_KEY_GROUP, created.id, &input.locales).await?;
    txn.commit().await?;
    Ok(created)
}

pub async fn update_option(db: &DatabaseConnection, option_id: i32, input: SpecOptionInput) -> Result<option::Model, ServiceError> {
    let name = required_name(&input.name, "option")?;
    validate_color(&input.color_rgb)?;
    let current = option::Entity::find_by_id(option_id).one(db).await?.ok_or_else(|| ServiceError::not_found("option"))?;
    ensure_option_name_free(db, current.specification_attribute_id, &name, Some(option_id)).await?;
    let txn = db.begin().await?;
    let mut am: option::ActiveModel = current.into();
    am.name = Set(name);
    am.alias = Set(clean(input.alias));
    am.display_order = Set(input.display_order);
    am.color_rgb = Set(clean(input.color_rgb));
    let updated = am.update(&txn).await?;
    localization::save_localized(&txn, OPTION_KEY_GROUP, option_id, &input.locales).await?;
    txn.commit().await?;
    Ok(updated)
}

pub async fn delete_option(db: &DatabaseConnection, option_id: i32) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    localization::delete_localized(&txn, OPTION_KEY_GROUP, option_id).await?;
    let res = option::Entity::delete_by_id(option_id).exec(&txn).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("option"));
    }
    txn.commit().await?;
    Ok(())
}

/// Bulk display-order update. Ids not belonging to the attribute are rejected.
pub async fn set_option_orders(db: &DatabaseConnection, attribute_id: i32, orders: &[(i32, i32)]) -> Result<usize, ServiceError> {
    let options = list_options(db, attribute_id).await?;
    if let Some((bad, _)) = orders.iter().find(|(id, _)| !options.iter().any(|o| o.id == *id)) {
        return Err(ServiceError::validation(format!("option {bad} does not belong to attribute {attribute_id}")));
    }
    let txn = db.begin().await?;
    let mut changed = 0;
    for o in options {
        if let Some((_, order)) = orders.iter().find(|(id, _)| *id == o.id) {
            if o.display_order != *order {
                let mut am: option::ActiveModel = o.into();
                am.display_order = Set(*order);
                am.update(&txn).await?;
                changed += 1;
            }
        }
    }
    txn.commit().await?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn options_are_unique_and_reorderable() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let attr = create_attribute(&db, SpecAttributeInput { name: "Color".into(), allow_filtering: true, ..Default::default() }).await?;
        let id = attr.attribute.id;
        let red = create_option(&db, id, SpecOptionInput { name: "Red".into(), display_order: 1, color_rgb: Some("#ff0000".into()), ..Default::default() }).await?;
        let blue = create_option(&db, id, SpecOptionInput { name: "Blue".into(), display_order: 2, ..Default::default() }).await?;

        let dup = create_option(&db, id, SpecOptionInput { name: "Red".into(), ..Default::default() }).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Conflict(_)));
        assert!(create_option(&db, id, SpecOptionInput { name: "Green".into(), color_rgb: Some("green".into()), ..Default::default() }).await.is_err());

        assert_eq!(set_option_orders(&db, id, &[(red.id, 5), (blue.id, 2)]).await?, 1);
        let names: Vec<String> = list_options(&db, id).await?.into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["Blue", "Red"]);
        assert!(set_option_orders(&db, id, &[(9999, 1)]).await.is_err());

        delete_attribute(&db, id).await?;
        assert!(list_options(&db, id).await?.is_empty());
        Ok(())
    }
}
