//! Store mappings and ACL records: per-entity visibility by store and by customer role.

use std::collections::BTreeSet;

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use models::{acl_record, store_mapping};

use crate::errors::ServiceError;

/// Sync the stores an entity is limited to. Returns the new `limited_to_stores` flag.
pub async fn save_store_mappings<C: ConnectionTrait>(
    db: &C,
    entity_name: &str,
    entity_id: i32,
    store_ids: &[i32],
) -> Result<bool, ServiceError> {
    let wanted: BTreeSet<i32> = store_ids.iter().copied().collect();
    let existing = store_mapping::Entity::find()
        .filter(store_mapping::Column::EntityName.eq(entity_name))
        .filter(store_mapping::Column::EntityId.eq(entity_id))
        .all(db)
        .await?;
    let have: BTreeSet<i32> = existing.iter().map(|m| m.store_id).collect();

    for m in existing.iter().filter(|m| !wanted.contains(&m.store_id)) {
        store_mapping::Entity::delete_by_id(m.id).exec(db).await?;
    }
    for store_id in wanted.difference(&have) {
        store_mapping::ActiveModel {
            entity_id: Set(entity_id),
            entity_name: Set(entity_name.to_string()),
            store_id: Set(*store_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(!wanted.is_empty())
}

pub async fn get_store_ids<C: ConnectionTrait>(db: &C, entity_name: &str, entity_id: i32) -> Result<Vec<i32>, ServiceError> {
    let rows = store_mapping::Entity::find()
        .filter(store_mapping::Column::EntityName.eq(entity_name))
        .filter(store_mapping::Column::EntityId.eq(entity_id))
        .order_by_asc(store_mapping::Column::StoreId)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.store_id).collect())
}

pub async fn delete_store_mappings<C: ConnectionTrait>(db: &C, entity_name: &str, entity_id: i32) -> Result<(), ServiceError> {
    store_mapping::Entity::delete_many()
        .filter(store_mapping::Column::EntityName.eq(entity_name))
        .filter(store_mapping::Column::EntityId.eq(entity_id))
        .exec(db)
        .await?;
    Ok(())
}

pub fn is_authorized_in_store(limited_to_stores: bool, mapped_store_ids: &[i32], store_id: i32) -> bool {
    !limited_to_stores || mapped_store_ids.contains(&store_id)
}

/// Sync the customer roles allowed to see an entity. Returns the new `subject_to_acl` flag.
pub async fn save_acl<C: ConnectionTrait>(
    db: &C,
    entity_name: &str,
    entity_id: i32,
    role_ids: &[i32],
) -> Result<bool, ServiceError> {
    let wanted: BTreeSet<i32> = role_ids.iter().copied().collect();
    let existing = acl_record::Entity::find()
        .filter(acl_record::Column::EntityName.eq(entity_name))
        .filter(acl_record::Column::EntityId.eq(entity_id))
        .all(db)
        .await?;
    let have: BTreeSet<i32> = existing.iter().map(|m| m.customer_role_id).collect();

    for m in existing.iter().filter(|m| !wanted.contains(&m.customer_role_id)) {
        acl_record::Entity::delete_by_id(m.id).exec(db).await?;
    }
    for role_id in wanted.difference(&have) {
        acl_record::ActiveModel {
            entity_id: Set(entity_id),
            entity_name: Set(entity_name.to_string()),
            customer_role_id: Set(*role_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(!wanted.is_empty())
}

pub async fn get_role_ids<C: ConnectionTrait>(db: &C, entity_name: &str, entity_id: i32) -> Result<Vec<i32>, ServiceError> {
    let rows = acl_record::Entity::find()
        .filter(acl_record::Column::EntityName.eq(entity_name))
        .filter(acl_record::Column::EntityId.eq(entity_id))
        .order_by_asc(acl_record::Column::CustomerRoleId)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.customer_role_id).collect())
}

pub async fn delete_acl<C: ConnectionTrait>(db: &C, entity_name: &str, entity_id: i32) -> Result<(), ServiceError> {
    acl_record::Entity::delete_many()
        .filter(acl_record::Column::EntityName.eq(entity_name))
        .filter(acl_record::Column::EntityId.eq(entity_id))
        .exec(db)
        .await?;
    Ok(())
}

pub fn is_authorized_for_roles(subject_to_acl: bool, allowed_role_ids: &[i32], customer_role_ids: &[i32]) -> bool {
    !subject_to_acl || customer_role_ids.iter().any(|r| allowed_role_ids.contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use crate::{customer, store};

    #[test]
    fn authorization_helpers() {
        assert!(is_authorized_in_store(false, &[], 3));
        assert!(is_authorized_in_store(true, &[1, 3], 3));
        assert!(!is_authorized_in_store(true, &[1], 3));
        assert!(is_authorized_for_roles(false, &[], &[]));
        assert!(is_authorized_for_roles(true, &[2, 5], &[5]));
        assert!(!is_authorized_for_roles(true, &[2], &[5]));
    }

    #[tokio::test]
    async fn store_mapping_diff() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let a = store::create_store(&db, store::StoreInput::named("A", "https://a.example.com")).await?;
        let b = store::create_store(&db, store::StoreInput::named("B", "https://b.example.com")).await?;
        let c = store::create_store(&db, store::StoreInput::named("C", "https://c.example.com")).await?;

        assert!(save_store_mappings(&db, "Topic", 1, &[a.id, b.id]).await?);
        assert!(save_store_mappings(&db, "Topic", 1, &[b.id, c.id, c.id]).await?);
        assert_eq!(get_store_ids(&db, "Topic", 1).await?, vec![b.id, c.id]);
        assert!(!save_store_mappings(&db, "Topic", 1, &[]).await?);
        assert!(get_store_ids(&db, "Topic", 1).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn acl_diff() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let r1 = customer::create_role(&db, customer::RoleInput::named("Guests")).await?;
        let r2 = customer::create_role(&db, customer::RoleInput::named("Wholesale")).await?;
        assert!(save_acl(&db, "Category", 4, &[r1.id]).await?);
        assert!(save_acl(&db, "Category", 4, &[r2.id]).await?);
        assert_eq!(get_role_ids(&db, "Category", 4).await?, vec![r2.id]);
        delete_acl(&db, "Category", 4).await?;
        assert!(get_role_ids(&db, "Category", 4).await?.is_empty());
        Ok(())
    }
}
