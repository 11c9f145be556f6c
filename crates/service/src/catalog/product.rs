use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use models::{product, product_category};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub manufacturer_id: Option<i32>,
    #[serde(default)]
    pub category_ids: Vec<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: product::Model,
    pub category_ids: Vec<i32>,
}

fn validate(input: &ProductInput) -> Result<(), ServiceError> {
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("product name required"));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(ServiceError::validation("price must be a non-negative number"));
    }
    Ok(())
}

pub async fn category_ids_of<C: ConnectionTrait>(db: &C, product_id: i32) -> Result<Vec<i32>, ServiceError> {
    let rows = product_category::Entity::find()
        .filter(product_category::Column::ProductId.eq(product_id))
        .order_by_asc(product_category::Column::DisplayOrder)
        .order_by_asc(product_category::Column::CategoryId)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.category_id).collect())
}

async fn set_categories<C: ConnectionTrait>(db: &C, product_id: i32, category_ids: &[i32]) -> Result<(), ServiceError> {
    let wanted: BTreeSet<i32> = category_ids.iter().copied().collect();
    let existing = product_category::Entity::find()
        .filter(product_category::Column::ProductId.eq(product_id))
        .all(db)
        .await?;
    let have: BTreeSet<i32> = existing.iter().map(|r| r.category_id).collect();
    for r in existing.iter().filter(|r| !wanted.contains(&r.category_id)) {
        product_category::Entity::delete_by_id(r.id).exec(db).await?;
    }
    for cid in wanted.difference(&have) {
        product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(*cid),
            display_order: Set(0),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

pub async fn list_products(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<product::Model>, ServiceError> {
    let mut q = product::Entity::find().filter(product::Column::Deleted.eq(false));
    if let Some(term) = cmd.search_term() {
        q = q.filter(product::Column::Name.contains(term).or(product::Column::Sku.eq(term)));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(product::Column::Name).order_by_asc(product::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_product(db: &DatabaseConnection, id: i32) -> Result<ProductDetails, ServiceError> {
    let product = product::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|p| !p.deleted)
        .ok_or_else(|| ServiceError::not_found("product"))?;
    Ok(ProductDetails { category_ids: category_ids_of(db, id).await?, product })
}

pub async fn create_product(db: &DatabaseConnection, input: ProductInput) -> Result<ProductDetails, ServiceError> {
    validate(&input)?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let created = product::ActiveModel {
        name: Set(input.name.trim().to_string()),
        sku: Set(input.sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())),
        price: Set(input.price),
        published: Set(input.published),
        deleted: Set(false),
        stock_quantity: Set(input.stock_quantity),
        manufacturer_id: Set(input.manufacturer_id),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    set_categories(&txn, created.id, &input.category_ids).await?;
    txn.commit().await?;
    get_product(db, created.id).await
}

pub async fn update_product(db: &DatabaseConnection, id: i32, input: ProductInput) -> Result<ProductDetails, ServiceError> {
    validate(&input)?;
    let current = get_product(db, id).await?;
    let txn = db.begin().await?;
    let mut am: product::ActiveModel = current.product.into();
    am.name = Set(input.name.trim().to_string());
    am.sku = Set(input.sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
    am.price = Set(input.price);
    am.published = Set(input.published);
    am.stock_quantity = Set(input.stock_quantity);
    am.manufacturer_id = Set(input.manufacturer_id);
    am.updated_on_utc = Set(Utc::now().into());
    am.update(&txn).await?;
    set_categories(&txn, id, &input.category_ids).await?;
    txn.commit().await?;
    get_product(db, id).await
}

pub async fn delete_product(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let current = get_product(db, id).await?.product;
    let mut am: product::ActiveModel = current.into();
    am.deleted = Set(true);
    am.updated_on_utc = Set(Utc::now().into());
    am.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::category::{create_category, CategoryInput};
    use crate::test_support::get_db;

    #[tokio::test]
    async fn product_categories_are_synced() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let c1 = create_category(&db, CategoryInput { name: "Tools".into(), ..Default::default() }).await?.category;
        let c2 = create_category(&db, CategoryInput { name: "Garden".into(), ..Default::default() }).await?.category;
        let p = create_product(&db, ProductInput { name: "Rake".into(), price: 12.5, category_ids: vec![c1.id], ..Default::default() }).await?;
        assert_eq!(p.category_ids, vec![c1.id]);

        let p = update_product(&db, p.product.id, ProductInput { name: "Rake".into(), price: 10.0, category_ids: vec![c2.id], ..Default::default() }).await?;
        assert_eq!(p.category_ids, vec![c2.id]);
        assert_eq!(p.product.price, 10.0);

        assert!(create_product(&db, ProductInput { name: "Bad".into(), price: -1.0, ..Default::default() }).await.is_err());
        delete_product(&db, p.product.id).await?;
        assert!(get_product(&db, p.product.id).await.is_err());
        Ok(())
    }
}
