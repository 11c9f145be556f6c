//! Product attributes (variant definitions) and their options.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use models::product_attribute::{self as attribute, ENTITY_NAME};
use models::product_attribute_option as option;

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::localization::{self, LocalizedValue};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductAttributeInput {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allow_filtering: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AttributeOptionInput {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub price_adjustment: f64,
    #[serde(default)]
    pub weight_adjustment: f64,
    #[serde(default)]
    pub is_preselected: bool,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductAttributeDetails {
    #[serde(flatten)]
    pub attribute: attribute::Model,
    pub locales: Vec<LocalizedValue>,
    pub options: Vec<option::Model>,
}

fn clean(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn ensure_alias_free(db: &DatabaseConnection, alias: &Option<String>, except: Option<i32>) -> Result<(), ServiceError> {
    let Some(alias) = alias else { return Ok(()) };
    let mut q = attribute::Entity::find().filter(attribute::Column::Alias.eq(alias.as_str()));
    if let Some(id) = except {
        q = q.filter(attribute::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("alias {alias} is already used")));
    }
    Ok(())
}

pub async fn list_attributes(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<attribute::Model>, ServiceError> {
    let mut q = attribute::Entity::find();
    if let Some(term) = cmd.search_term() {
        q = q.filter(attribute::Column::Name.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(attribute::Column::DisplayOrder).order_by_asc(attribute::Column::Name);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_attribute(db: &DatabaseConnection, id: i32) -> Result<ProductAttributeDetails, ServiceError> {
    let attribute = attribute::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("product attribute"))?;
    Ok(ProductAttributeDetails {
        locales: localization::get_localized(db, ENTITY_NAME, id).await?,
        options: list_options(db, id).await?,
        attribute,
    })
}

pub async fn create_attribute(db: &DatabaseConnection, input: ProductAttributeInput) -> Result<ProductAttributeDetails, ServiceError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("attribute name required"));
    }
    let alias = clean(input.alias);
    ensure_alias_free(db, &alias, None).await?;
    let txn = db.begin().await?;
    let created = attribute::ActiveModel {
        name: Set(name),
        alias: Set(alias),
        description: Set(clean(input.description)),
        allow_filtering: Set(input.allow_filtering),
        display_order: Set(input.display_order),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, ENTITY_NAME, created.id, &input.locales).await?;
    txn.commit().await?;
    get_attribute(db, created.id).await
}

pub async fn update_attribute(db: &DatabaseConnection, id: i32, input: ProductAttributeInput) -> Result<ProductAttributeDetails, ServiceError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("attribute name required"));
    }
    let current = get_attribute(db, id).await?.attribute;
    let alias = clean(input.alias);
    ensure_alias_free(db, &alias, Some(id)).await?;
    let txn = db.begin().await?;
    let mut am: attribute::ActiveModel = current.into();
    am.name = Set(name);
    am.alias = Set(alias);
    am.description = Set(clean(input.description));
    am.allow_filtering = Set(input.allow_filtering);
    am.display_order = Set(input.display_order);
    am.update(&txn).await?;
    localization::save_localized(&txn, ENTITY_NAME, id, &input.locales).await?;
    txn.commit().await?;
    get_attribute(db, id).await
}

pub async fn delete_attribute(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    option::Entity::delete_many()
        .filter(option::Column::ProductAttributeId.eq(id))
        .exec(&txn)
        .await?;
    localization::delete_localized(&txn, ENTITY_NAME, id).await?;
    let res = attribute::Entity::delete_by_id(id).exec(&txn).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("product attribute"));
    }
    txn.commit().await?;
    Ok(())
}

pub async fn list_options(db: &DatabaseConnection, attribute_id: i32) -> Result<Vec<option::Model>, ServiceError> {
    Ok(option::Entity::find()
        .filter(option::Column::ProductAttributeId.eq(attribute_id))
        .order_by_asc(option::Column::DisplayOrder)
        .order_by_asc(option::Column::Id)
        .all(db)
        .await?)
}

fn validate_option(input: &AttributeOptionInput) -> Result<String, ServiceError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("option name required"));
    }
    if !input.price_adjustment.is_finite() || !input.weight_adjustment.is_finite() {
        return Err(ServiceError::validation("adjustments must be finite numbers"));
    }
    Ok(name.to_string())
}

async fn clear_preselected<C: ConnectionTrait>(db: &C, attribute_id: i32, keep: i32) -> Result<(), ServiceError> {
    option::Entity::update_many()
        .col_expr(option::Column::IsPreselected, sea_orm::sea_query::Expr::value(false))
        .filter(option::Column::ProductAttributeId.eq(attribute_id))
        .filter(option::Column::Id.ne(keep))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn create_option(db: &DatabaseConnection, attribute_id: i32, input: AttributeOptionInput) -> Result<option::Model, ServiceError> {
    let name = validate_option(&input)?;
    get_attribute(db, attribute_id).await?;
    let txn = db.begin().await?;
    let created = option::ActiveModel {
        product_attribute_id: Set(attribute_id),
        name: Set(name),
        alias: Set(clean(input.alias)),
        price_adjustment: Set(input.price_adjustment),
        weight_adjustment: Set(input.weight_adjustment),
        is_preselected: Set(input.is_preselected),
        display_order: Set(input.display_order),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    if created.is_preselected {
        clear_preselected(&txn, attribute_id, created.id).await?;
    }
    txn.commit().await?;
    Ok(created)
}

pub async fn update_option(db: &DatabaseConnection, option_id: i32, input: AttributeOptionInput) -> Result<option::Model, ServiceError> {
    let name = validate_option(&input)?;
    let current = option::Entity::find_by_id(option_id).one(db).await?.ok_or_else(|| ServiceError::not_found("option"))?;
    let attribute_id = current.product_attribute_id;
    let txn = db.begin().await?;
    let mut am: option::ActiveModel = current.into();
    am.name = Set(name);
    am.alias = Set(clean(input.alias));
    am.price_adjustment = Set(input.price_adjustment);
    am.weight_adjustment = Set(input.weight_adjustment);
    am.is_preselected = Set(input.is_preselected);
    am.display_order = Set(input.display_order);
    let updated = am.update(&txn).await?;
    if updated.is_preselected {
        clear_preselected(&txn, attribute_id, option_id).await?;
    }
    txn.commit().await?;
    Ok(updated)
}

pub async fn delete_option(db: &DatabaseConnection, option_id: i32) -> Result<(), ServiceError> {
    let res = option::Entity::delete_by_id(option_id).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("option"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, unique};

    #[tokio::test]
    async fn single_preselected_option() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let attr = create_attribute(&db, ProductAttributeInput { name: "Size".into(), alias: Some(unique("size")), ..Default::default() }).await?;
        let id = attr.attribute.id;
        let s = create_option(&db, id, AttributeOptionInput { name: "S".into(), is_preselected: true, ..Default::default() }).await?;
        let m = create_option(&db, id, AttributeOptionInput { name: "M".into(), is_preselected: true, price_adjustment: 2.0, ..Default::default() }).await?;

        let pre: Vec<i32> = list_options(&db, id).await?.into_iter().filter(|o| o.is_preselected).map(|o| o.id).collect();
        assert_eq!(pre, vec![m.id]);

        update_option(&db, s.id, AttributeOptionInput { name: "S".into(), is_preselected: true, ..Default::default() }).await?;
        let pre: Vec<i32> = list_options(&db, id).await?.into_iter().filter(|o| o.is_preselected).map(|o| o.id).collect();
        assert_eq!(pre, vec![s.id]);
        Ok(())
    }

    #[tokio::test]
    async fn alias_must_be_unique() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let alias = unique("color");
        create_attribute(&db, ProductAttributeInput { name: "Color".into(), alias: Some(alias.clone()), ..Default::default() }).await?;
        let err = create_attribute(&db, ProductAttributeInput { name: "Colour".into(), alias: Some(alias), ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        create_attribute(&db, ProductAttributeInput { name: "NoAlias".into(), ..Default::default() }).await?;
        create_attribute(&db, ProductAttributeInput { name: "NoAlias2".into(), ..Default::default() }).await?;
        Ok(())
    }
}
