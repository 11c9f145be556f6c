//! Menus and their item hierarchies.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use models::menu::{self, ENTITY_NAME};
use models::menu_item;

use crate::catalog::tree::{self, DropPlan, DropPosition, TreeNode};
use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::localization::{self, LocalizedValue};
use crate::mapping;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MenuInput {
    pub system_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
    #[serde(default)]
    pub store_ids: Vec<i32>,
    #[serde(default)]
    pub role_ids: Vec<i32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MenuItemInput {
    #[serde(default)]
    pub parent_item_id: Option<i32>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub css_class: Option<String>,
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MenuDetails {
    #[serde(flatten)]
    pub menu: menu::Model,
    pub locales: Vec<LocalizedValue>,
    pub store_ids: Vec<i32>,
    pub role_ids: Vec<i32>,
}

/// Item with its children, ordered by display order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MenuItemNode {
    #[serde(flatten)]
    pub item: menu_item::Model,
    pub children: Vec<MenuItemNode>,
}

async fn ensure_system_name_free(db: &DatabaseConnection, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
    let mut q = menu::Entity::find().filter(menu::Column::SystemName.eq(name));
    if let Some(id) = except {
        q = q.filter(menu::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("menu {name} already exists")));
    }
    Ok(())
}

pub async fn list_menus(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<menu::Model>, ServiceError> {
    let mut q = menu::Entity::find();
    if let Some(term) = cmd.search_term() {
        q = q.filter(menu::Column::SystemName.contains(term).or(menu::Column::Title.contains(term)));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(menu::Column::SystemName);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_menu(db: &DatabaseConnection, id: i32) -> Result<MenuDetails, ServiceError> {
    let menu = menu::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("menu"))?;
    Ok(MenuDetails {
        locales: localization::get_localized(db, ENTITY_NAME, id).await?,
        store_ids: mapping::get_store_ids(db, ENTITY_NAME, id).await?,
        role_ids: mapping::get_role_ids(db, ENTITY_NAME, id).await?,
        menu,
    })
}

pub async fn create_menu(db: &DatabaseConnection, input: MenuInput) -> Result<MenuDetails, ServiceError> {
    let system_name = menu::validate_system_name(&input.system_name)?;
    ensure_system_name_free(db, &system_name, None).await?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let created = menu::ActiveModel {
        system_name: Set(system_name),
        title: Set(input.title),
        template: Set(input.template),
        published: Set(input.published),
        is_system: Set(false),
        limited_to_stores: Set(false),
        subject_to_acl: Set(false),
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
        let mut am: menu::ActiveModel = created.clone().into();
        am.limited_to_stores = Set(limited);
        am.subject_to_acl = Set(acl);
        am.update(&txn).await?;
    }
    txn.commit().await?;
    get_menu(db, created.id).await
}

/// System menus keep their system name.
pub async fn update_menu(db: &DatabaseConnection, id: i32, input: MenuInput) -> Result<MenuDetails, ServiceError> {
    let current = get_menu(db, id).await?.menu;
    let system_name = menu::validate_system_name(&input.system_name)?;
    if current.is_system && system_name != current.system_name {
        return Err(ServiceError::validation("the system name of a system menu cannot be changed"));
    }
    ensure_system_name_free(db, &system_name, Some(id)).await?;
    let txn = db.begin().await?;
    localization::save_localized(&txn, ENTITY_NAME, id, &input.locales).await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, id, &input.store_ids).await?;
    let acl = mapping::save_acl(&txn, ENTITY_NAME, id, &input.role_ids).await?;
    let mut am: menu::ActiveModel = current.into();
    am.system_name = Set(system_name);
    am.title = Set(input.title);
    am.template = Set(input.template);
    am.published = Set(input.published);
    am.limited_to_stores = Set(limited);
    am.subject_to_acl = Set(acl);
    am.updated_on_utc = Set(Utc::now().into());
    am.update(&txn).await?;
    txn.commit().await?;
    get_menu(db, id).await
}

pub async fn delete_menu(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let current = get_menu(db, id).await?.menu;
    if current.is_system {
        return Err(ServiceError::conflict(format!("system menu {} cannot be deleted", current.system_name)));
    }
    let items = list_items(db, id).await?;
    let txn = db.begin().await?;
    for item in &items {
        localization::delete_localized(&txn, menu_item::ENTITY_NAME, item.id).await?;
    }
    menu_item::Entity::delete_many().filter(menu_item::Column::MenuId.eq(id)).exec(&txn).await?;
    localization::delete_localized(&txn, ENTITY_NAME, id).await?;
    mapping::delete_store_mappings(&txn, ENTITY_NAME, id).await?;
    mapping::delete_acl(&txn, ENTITY_NAME, id).await?;
    menu::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

// ----- items -----

pub async fn list_items(db: &DatabaseConnection, menu_id: i32) -> Result<Vec<menu_item::Model>, ServiceError> {
    Ok(menu_item::Entity::find()
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .order_by_asc(menu_item::Column::DisplayOrder)
        .order_by_asc(menu_item::Column::Id)
        .all(db)
        .await?)
}

pub async fn get_item(db: &DatabaseConnection, id: i32) -> Result<menu_item::Model, ServiceError> {
    menu_item::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("menu item"))
}

fn nodes_of(items: &[menu_item::Model]) -> Vec<TreeNode> {
    items
        .iter()
        .map(|i| TreeNode { id: i.id, parent_id: i.parent_item_id, display_order: i.display_order })
        .collect()
}

fn check_item_parent(items: &[menu_item::Model], id: Option<i32>, parent: Option<i32>) -> Result<(), ServiceError> {
    let Some(pid) = parent else { return Ok(()) };
    if !items.iter().any(|i| i.id == pid) {
        return Err(ServiceError::validation("parent item must belong to the same menu"));
    }
    match id {
        Some(id) => tree::check_parent(&nodes_of(items), id, parent),
        None => Ok(()),
    }
}

pub async fn create_item(db: &DatabaseConnection, menu_id: i32, input: MenuItemInput) -> Result<menu_item::Model, ServiceError> {
    get_menu(db, menu_id).await?;
    let items = list_items(db, menu_id).await?;
    check_item_parent(&items, None, input.parent_item_id)?;
    let txn = db.begin().await?;
    let created = menu_item::ActiveModel {
        menu_id: Set(menu_id),
        parent_item_id: Set(input.parent_item_id),
        provider_name: Set(input.provider_name),
        model: Set(input.model),
        title: Set(input.title),
        display_order: Set(input.display_order),
        published: Set(input.published),
        css_class: Set(input.css_class),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, menu_item::ENTITY_NAME, created.id, &input.locales).await?;
    txn.commit().await?;
    Ok(created)
}

pub async fn update_item(db: &DatabaseConnection, id: i32, input: MenuItemInput) -> Result<menu_item::Model, ServiceError> {
    let current = get_item(db, id).await?;
    let items = list_items(db, current.menu_id).await?;
    check_item_parent(&items, Some(id), input.parent_item_id)?;
    let txn = db.begin().await?;
    let mut am: menu_item::ActiveModel = current.into();
    am.parent_item_id = Set(input.parent_item_id);
    am.provider_name = Set(input.provider_name);
    am.model = Set(input.model);
    am.title = Set(input.title);
    am.display_order = Set(input.display_order);
    am.published = Set(input.published);
    am.css_class = Set(input.css_class);
    let updated = am.update(&txn).await?;
    localization::save_localized(&txn, menu_item::ENTITY_NAME, id, &input.locales).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Deletes the item and its whole subtree.
pub async fn delete_item(db: &DatabaseConnection, id: i32) -> Result<u64, ServiceError> {
    let current = get_item(db, id).await?;
    let items = list_items(db, current.menu_id).await?;
    let mut doomed = vec![id];
    let mut i = 0;
    while i < doomed.len() {
        let pid = doomed[i];
        doomed.extend(items.iter().filter(|c| c.parent_item_id == Some(pid)).map(|c| c.id));
        i += 1;
    }
    let txn = db.begin().await?;
    for item_id in &doomed {
        localization::delete_localized(&txn, menu_item::ENTITY_NAME, *item_id).await?;
    }
    // children first so the self reference never dangles
    let mut deleted = 0;
    for item_id in doomed.iter().rev() {
        deleted += menu_item::Entity::delete_by_id(*item_id).exec(&txn).await?.rows_affected;
    }
    txn.commit().await?;
    Ok(deleted)
}

/// Drag-and-drop of an item within its menu.
pub async fn move_item(db: &DatabaseConnection, item: i32, target: i32, position: DropPosition) -> Result<DropPlan, ServiceError> {
    let current = get_item(db, item).await?;
    let items = list_items(db, current.menu_id).await?;
    if !items.iter().any(|i| i.id == target) {
        return Err(ServiceError::validation("target item must belong to the same menu"));
    }
    let plan = tree::plan_drop(&nodes_of(&items), item, target, position)?;
    let by_id: HashMap<i32, &menu_item::Model> = items.iter().map(|i| (i.id, i)).collect();
    let txn = db.begin().await?;
    for (id, order) in &plan.orders {
        let Some(row) = by_id.get(id) else { continue };
        let mut am: menu_item::ActiveModel = (*row).clone().into();
        am.display_order = Set(*order);
        if *id == plan.item_id {
            am.parent_item_id = Set(plan.new_parent_id);
        }
        am.update(&txn).await?;
    }
    txn.commit().await?;
    info!(item, target, ?position, "menu item moved");
    Ok(plan)
}

/// Nests a flat item list. Items whose parent is missing are attached at the root.
pub fn build_tree(items: &[menu_item::Model]) -> Vec<MenuItemNode> {
    let ids: std::collections::HashSet<i32> = items.iter().map(|i| i.id).collect();
    let mut children: HashMap<Option<i32>, Vec<&menu_item::Model>> = HashMap::new();
    for item in items {
        let parent = item.parent_item_id.filter(|p| ids.contains(p) && *p != item.id);
        children.entry(parent).or_default().push(item);
    }
    for list in children.values_mut() {
        list.sort_by_key(|i| (i.display_order, i.id));
    }
    fn build(parent: Option<i32>, children: &HashMap<Option<i32>, Vec<&menu_item::Model>>, depth: usize) -> Vec<MenuItemNode> {
        if depth > 64 {
            return Vec::new();
        }
        children
            .get(&parent)
            .map(|list| {
                list.iter()
                    .map(|i| MenuItemNode { item: (*i).clone(), children: build(Some(i.id), children, depth + 1) })
                    .collect()
            })
            .unwrap_or_default()
    }
    build(None, &children, 0)
}

pub async fn menu_tree(db: &DatabaseConnection, menu_id: i32) -> Result<Vec<MenuItemNode>, ServiceError> {
    get_menu(db, menu_id).await?;
    Ok(build_tree(&list_items(db, menu_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, unique};

    fn item(title: &str, parent_item_id: Option<i32>, display_order: i32) -> MenuItemInput {
        MenuItemInput { title: Some(title.into()), parent_item_id, display_order, published: true, ..Default::default() }
    }

    #[tokio::test]
    async fn system_menu_is_protected() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let name = unique("main");
        let m = create_menu(&db, MenuInput { system_name: name.clone(), ..Default::default() }).await?;
        assert!(matches!(
            create_menu(&db, MenuInput { system_name: name.clone(), ..Default::default() }).await.unwrap_err(),
            ServiceError::Conflict(_)
        ));
        assert!(create_menu(&db, MenuInput { system_name: "has space".into(), ..Default::default() }).await.is_err());

        let mut am: menu::ActiveModel = m.menu.clone().into();
        am.is_system = Set(true);
        am.update(&db).await?;
        assert!(update_menu(&db, m.menu.id, MenuInput { system_name: unique("other"), ..Default::default() }).await.is_err());
        update_menu(&db, m.menu.id, MenuInput { system_name: name, title: Some("Main".into()), ..Default::default() }).await?;
        assert!(matches!(delete_menu(&db, m.menu.id).await.unwrap_err(), ServiceError::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn items_nest_and_move() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let m = create_menu(&db, MenuInput { system_name: unique("footer"), ..Default::default() }).await?.menu;
        let other = create_menu(&db, MenuInput { system_name: unique("header"), ..Default::default() }).await?.menu;
        let help = create_item(&db, m.id, item("Help", None, 10)).await?;
        let faq = create_item(&db, m.id, item("FAQ", Some(help.id), 10)).await?;
        let about = create_item(&db, m.id, item("About", None, 20)).await?;
        assert!(create_item(&db, other.id, item("Foreign", Some(help.id), 0)).await.is_err());

        let tree = menu_tree(&db, m.id).await?;
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children[0].item.id, faq.id);

        move_item(&db, about.id, help.id, DropPosition::Over).await?;
        let tree = menu_tree(&db, m.id).await?;
        assert_eq!(tree.len(), 1);
        let kids: Vec<i32> = tree[0].children.iter().map(|c| c.item.id).collect();
        assert_eq!(kids, vec![faq.id, about.id]);

        assert!(move_item(&db, help.id, faq.id, DropPosition::Over).await.is_err());
        assert_eq!(delete_item(&db, help.id).await?, 3);
        assert!(menu_tree(&db, m.id).await?.is_empty());
        Ok(())
    }
}
