use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use models::category::{self, ENTITY_NAME};

use crate::catalog::tree::{self, DropPlan, DropPosition, TreeNode};
use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::localization::{self, LocalizedValue};
use crate::mapping;

pub const BREADCRUMB_SEPARATOR: &str = " » ";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
    #[serde(default)]
    pub store_ids: Vec<i32>,
    #[serde(default)]
    pub role_ids: Vec<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryDetails {
    #[serde(flatten)]
    pub category: category::Model,
    pub locales: Vec<LocalizedValue>,
    pub store_ids: Vec<i32>,
    pub role_ids: Vec<i32>,
}

/// Flattened tree row with its breadcrumb path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub display_order: i32,
    pub published: bool,
    pub depth: usize,
    pub breadcrumb: String,
}

async fn live_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>, ServiceError> {
    Ok(category::Entity::find()
        .filter(category::Column::Deleted.eq(false))
        .order_by_asc(category::Column::DisplayOrder)
        .order_by_asc(category::Column::Id)
        .all(db)
        .await?)
}

fn nodes_of(rows: &[category::Model]) -> Vec<TreeNode> {
    rows.iter()
        .map(|c| TreeNode { id: c.id, parent_id: c.parent_id, display_order: c.display_order })
        .collect()
}

pub async fn list_categories(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<category::Model>, ServiceError> {
    let mut q = category::Entity::find().filter(category::Column::Deleted.eq(false));
    if let Some(term) = cmd.search_term() {
        q = q.filter(category::Column::Name.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(category::Column::DisplayOrder).order_by_asc(category::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

/// Flatten the live categories depth-first. Rows whose parent is missing or deleted hang off the root.
pub fn flatten_tree(rows: &[category::Model]) -> Vec<CategoryNode> {
    let ids: HashSet<i32> = rows.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<i32>, Vec<&category::Model>> = HashMap::new();
    for c in rows {
        let parent = c.parent_id.filter(|p| ids.contains(p) && *p != c.id);
        children.entry(parent).or_default().push(c);
    }
    for list in children.values_mut() {
        list.sort_by_key(|c| (c.display_order, c.id));
    }

    let mut out = Vec::with_capacity(rows.len());
    let mut visited = HashSet::new();
    // (node, depth, parent breadcrumb)
    let mut stack: Vec<(&category::Model, usize, String)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|c| (*c, 0, String::new())).collect())
        .unwrap_or_default();
    while let Some((c, depth, prefix)) = stack.pop() {
        if !visited.insert(c.id) {
            continue;
        }
        let breadcrumb = if prefix.is_empty() { c.name.clone() } else { format!("{prefix}{BREADCRUMB_SEPARATOR}{}", c.name) };
        if let Some(kids) = children.get(&Some(c.id)) {
            for k in kids.iter().rev() {
                stack.push((*k, depth + 1, breadcrumb.clone()));
            }
        }
        out.push(CategoryNode {
            id: c.id,
            name: c.name.clone(),
            parent_id: c.parent_id.filter(|p| ids.contains(p)),
            display_order: c.display_order,
            published: c.published,
            depth,
            breadcrumb,
        });
    }
    out
}

pub async fn category_tree(db: &DatabaseConnection) -> Result<Vec<CategoryNode>, ServiceError> {
    Ok(flatten_tree(&live_categories(db).await?))
}

pub async fn get_category(db: &DatabaseConnection, id: i32) -> Result<CategoryDetails, ServiceError> {
    let category = category::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|c| !c.deleted)
        .ok_or_else(|| ServiceError::not_found("category"))?;
    Ok(CategoryDetails {
        locales: localization::get_localized(db, ENTITY_NAME, id).await?,
        store_ids: mapping::get_store_ids(db, ENTITY_NAME, id).await?,
        role_ids: mapping::get_role_ids(db, ENTITY_NAME, id).await?,
        category,
    })
}

async fn check_parent(db: &DatabaseConnection, id: Option<i32>, parent_id: Option<i32>) -> Result<(), ServiceError> {
    let Some(pid) = parent_id else { return Ok(()) };
    let rows = live_categories(db).await?;
    if !rows.iter().any(|c| c.id == pid) {
        return Err(ServiceError::validation("parent category does not exist"));
    }
    if let Some(id) = id {
        tree::check_parent(&nodes_of(&rows), id, Some(pid))?;
    }
    Ok(())
}

pub async fn create_category(db: &DatabaseConnection, input: CategoryInput) -> Result<CategoryDetails, ServiceError> {
    let name = category::validate_name(&input.name)?;
    check_parent(db, None, input.parent_id).await?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let created = category::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        parent_id: Set(input.parent_id),
        display_order: Set(input.display_order),
        published: Set(input.published),
        deleted: Set(false),
        subject_to_acl: Set(false),
        limited_to_stores: Set(false),
        created_on_utc: Set(now.into()),
        updated_on_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, ENTITY_NAME, created.id, &input.locales).await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, created.id, &input.store_ids).await?;
    let acl = mapping::save_acl(&txn, ENTITY_NAME, created.id, &input.role_ids).await?;
    if limited || acl {
        let mut am: category::ActiveModel = created.clone().into();
        am.limited_to_stores = Set(limited);
        am.subject_to_acl = Set(acl);
        am.update(&txn).await?;
    }
    txn.commit().await?;
    info!(id = created.id, "category created");
    get_category(db, created.id).await
}

pub async fn update_category(db: &DatabaseConnection, id: i32, input: CategoryInput) -> Result<CategoryDetails, ServiceError> {
    let name = category::validate_name(&input.name)?;
    let current = get_category(db, id).await?;
    check_parent(db, Some(id), input.parent_id).await?;
    let txn = db.begin().await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, id, &input.store_ids).await?;
    let acl = mapping::save_acl(&txn, ENTITY_NAME, id, &input.role_ids).await?;
    localization::save_localized(&txn, ENTITY_NAME, id, &input.locales).await?;
    let mut am: category::ActiveModel = current.category.into();
    am.name = Set(name);
    am.description = Set(input.description);
    am.parent_id = Set(input.parent_id);
    am.display_order = Set(input.display_order);
    am.published = Set(input.published);
    am.limited_to_stores = Set(limited);
    am.subject_to_acl = Set(acl);
    am.updated_on_utc = Set(Utc::now().into());
    am.update(&txn).await?;
    txn.commit().await?;
    get_category(db, id).await
}

/// Soft delete. Children move up to the deleted node's parent.
pub async fn delete_category(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let current = get_category(db, id).await?.category;
    let txn = db.begin().await?;
    category::Entity::update_many()
        .col_expr(category::Column::ParentId, sea_orm::sea_query::Expr::value(current.parent_id))
        .filter(category::Column::ParentId.eq(id))
        .exec(&txn)
        .await?;
    localization::delete_localized(&txn, ENTITY_NAME, id).await?;
    mapping::delete_store_mappings(&txn, ENTITY_NAME, id).await?;
    mapping::delete_acl(&txn, ENTITY_NAME, id).await?;
    let mut am: category::ActiveModel = current.into();
    am.deleted = Set(true);
    am.limited_to_stores = Set(false);
    am.subject_to_acl = Set(false);
    am.updated_on_utc = Set(Utc::now().into());
    am.update(&txn).await?;
    txn.commit().await?;
    info!(id, "category deleted");
    Ok(())
}

/// Move `item` relative to `target` and persist the new sibling orders.
pub async fn tree_drop(db: &DatabaseConnection, item: i32, target: i32, position: DropPosition) -> Result<DropPlan, ServiceError> {
    let rows = live_categories(db).await?;
    let plan = tree::plan_drop(&nodes_of(&rows), item, target, position)?;
    let by_id: HashMap<i32, &category::Model> = rows.iter().map(|c| (c.id, c)).collect();
    let txn = db.begin().await?;
    for (id, order) in &plan.orders {
        let Some(row) = by_id.get(id) else { continue };
        let mut am: category::ActiveModel = (*row).clone().into();
        am.display_order = Set(*order);
        if *id == plan.item_id {
            am.parent_id = Set(plan.new_parent_id);
        }
        am.update(&txn).await?;
    }
    txn.commit().await?;
    info!(item, target, ?position, "category moved");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn input(name: &str, parent_id: Option<i32>, display_order: i32) -> CategoryInput {
        CategoryInput { name: name.into(), parent_id, display_order, published: true, ..Default::default() }
    }

    fn row(id: i32, name: &str, parent_id: Option<i32>, display_order: i32) -> category::Model {
        let now = Utc::now().into();
        category::Model {
            id, name: name.into(), description: None, parent_id, display_order, published: true, deleted: false,
            subject_to_acl: false, limited_to_stores: false, created_on_utc: now, updated_on_utc: now,
        }
    }

    #[test]
    fn flatten_builds_breadcrumbs_and_adopts_orphans() {
        let rows = vec![
            row(1, "Apparel", None, 10),
            row(2, "Shoes", Some(1), 10),
            row(3, "Boots", Some(2), 10),
            row(4, "Orphan", Some(99), 5),
            row(5, "Books", None, 20),
        ];
        let flat = flatten_tree(&rows);
        let crumbs: Vec<&str> = flat.iter().map(|n| n.breadcrumb.as_str()).collect();
        assert_eq!(crumbs, vec!["Orphan", "Apparel", "Apparel » Shoes", "Apparel » Shoes » Boots", "Books"]);
        assert_eq!(flat[3].depth, 2);
        assert_eq!(flat[0].parent_id, None);
    }

    #[tokio::test]
    async fn category_crud_and_soft_delete_reparents() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let root = create_category(&db, input("Root", None, 10)).await?;
        let mid = create_category(&db, input("Mid", Some(root.category.id), 10)).await?;
        let leaf = create_category(&db, input("Leaf", Some(mid.category.id), 10)).await?;

        let err = update_category(&db, root.category.id, input("Root", Some(leaf.category.id), 10)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        delete_category(&db, mid.category.id).await?;
        let leaf = get_category(&db, leaf.category.id).await?;
        assert_eq!(leaf.category.parent_id, Some(root.category.id));
        assert!(matches!(get_category(&db, mid.category.id).await.unwrap_err(), ServiceError::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn tree_drop_persists_orders() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let parent = create_category(&db, input("P", None, 10)).await?.category;
        let a = create_category(&db, input("A", Some(parent.id), 1)).await?.category;
        let b = create_category(&db, input("B", Some(parent.id), 2)).await?.category;
        let c = create_category(&db, input("C", None, 30)).await?.category;

        tree_drop(&db, c.id, b.id, DropPosition::Before).await?;
        let c = get_category(&db, c.id).await?.category;
        let a = get_category(&db, a.id).await?.category;
        let b = get_category(&db, b.id).await?.category;
        assert_eq!(c.parent_id, Some(parent.id));
        assert!(a.display_order < c.display_order && c.display_order < b.display_order);

        let err = tree_drop(&db, parent.id, a.id, DropPosition::Over).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        Ok(())
    }
}
