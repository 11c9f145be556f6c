use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::{Deserialize, Serialize};

use models::manufacturer::{self, ENTITY_NAME};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::localization::{self, LocalizedValue};
use crate::mapping;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ManufacturerInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
    #[serde(default)]
    pub store_ids: Vec<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManufacturerDetails {
    #[serde(flatten)]
    pub manufacturer: manufacturer::Model,
    pub locales: Vec<LocalizedValue>,
    pub store_ids: Vec<i32>,
}

fn validate_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("manufacturer name required"));
    }
    Ok(name.to_string())
}

pub async fn list_manufacturers(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<manufacturer::Model>, ServiceError> {
    let mut q = manufacturer::Entity::find().filter(manufacturer::Column::Deleted.eq(false));
    if let Some(term) = cmd.search_term() {
        q = q.filter(manufacturer::Column::Name.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(manufacturer::Column::DisplayOrder).order_by_asc(manufacturer::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_manufacturer(db: &DatabaseConnection, id: i32) -> Result<ManufacturerDetails, ServiceError> {
    let manufacturer = manufacturer::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|m| !m.deleted)
        .ok_or_else(|| ServiceError::not_found("manufacturer"))?;
    Ok(ManufacturerDetails {
        locales: localization::get_localized(db, ENTITY_NAME, id).await?,
        store_ids: mapping::get_store_ids(db, ENTITY_NAME, id).await?,
        manufacturer,
    })
}

pub async fn create_manufacturer(db: &DatabaseConnection, input: ManufacturerInput) -> Result<ManufacturerDetails, ServiceError> {
    let name = validate_name(&input.name)?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let created = manufacturer::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        display_order: Set(input.display_order),
        published: Set(input.published),
        deleted: Set(false),
        limited_to_stores: Set(false),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, ENTITY_NAME, created.id, &input.locales).await?;
    if mapping::save_store_mappings(&txn, ENTITY_NAME, created.id, &input.store_ids).await? {
        let mut am: manufacturer::ActiveModel = created.clone().into();
        am.limited_to_stores = Set(true);
        am.update(&txn).await?;
    }
    txn.commit().await?;
    get_manufacturer(db, created.id).await
}

pub async fn update_manufacturer(db: &DatabaseConnection, id: i32, input: ManufacturerInput) -> Result<ManufacturerDetails, ServiceError> {
    let name = validate_name(&input.name)?;
    let current = get_manufacturer(db, id).await?;
    let txn = db.begin().await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, id, &input.store_ids).await?;
    localization::save_localized(&txn, ENTITY_NAME, id, &input.locales).await?;
    let mut am: manufacturer::ActiveModel = current.manufacturer.into();
    am.name = Set(name);
    am.description = Set(input.description);
    am.display_order = Set(input.display_order);
    am.published = Set(input.published);
    am.limited_to_stores = Set(limited);
    am.updated_on_utc = Set(Utc::now().into());
    am.update(&txn).await?;
    txn.commit().await?;
    get_manufacturer(db, id).await
}

pub async fn delete_manufacturer(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let current = get_manufacturer(db, id).await?.manufacturer;
    let txn = db.begin().await?;
    localization::delete_localized(&txn, ENTITY_NAME, id).await?;
    mapping::delete_store_mappings(&txn, ENTITY_NAME, id).await?;
    let mut am: manufacturer::ActiveModel = current.into();
    am.deleted = Set(true);
    am.updated_on_utc = Set(Utc::now().into());
    am.update(&txn).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, unique};

    #[tokio::test]
    async fn manufacturer_crud() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let name = unique("Acme");
        let m = create_manufacturer(&db, ManufacturerInput { name: name.clone(), published: true, ..Default::default() }).await?;
        assert_eq!(m.manufacturer.name, name);
        assert!(!m.manufacturer.limited_to_stores);

        let page = list_manufacturers(&db, &GridCommand { search: Some(name.clone()), ..Default::default() }).await?;
        assert_eq!(page.total, 1);

        let upd = update_manufacturer(&db, m.manufacturer.id, ManufacturerInput { name: "Acme Corp".into(), display_order: 3, ..Default::default() }).await?;
        assert_eq!(upd.manufacturer.display_order, 3);

        delete_manufacturer(&db, m.manufacturer.id).await?;
        assert!(get_manufacturer(&db, m.manufacturer.id).await.is_err());
        assert!(create_manufacturer(&db, ManufacturerInput::default()).await.is_err());
        Ok(())
    }
}
