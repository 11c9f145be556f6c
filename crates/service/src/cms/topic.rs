use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use models::topic::{self, ENTITY_NAME};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::localization::{self, LocalizedValue};
use crate::mapping;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TopicInput {
    pub system_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub include_in_sitemap: bool,
    #[serde(default)]
    pub is_password_protected: bool,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    /// `Title` and `Body` per language.
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
    #[serde(default)]
    pub store_ids: Vec<i32>,
    #[serde(default)]
    pub role_ids: Vec<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopicDetails {
    #[serde(flatten)]
    pub topic: topic::Model,
    pub locales: Vec<LocalizedValue>,
    pub store_ids: Vec<i32>,
    pub role_ids: Vec<i32>,
}

struct Validated {
    system_name: String,
    password: Option<String>,
}

async fn validate(db: &DatabaseConnection, input: &TopicInput, except: Option<i32>) -> Result<Validated, ServiceError> {
    let system_name = topic::normalize_system_name(&input.system_name);
    if system_name.is_empty() {
        return Err(ServiceError::validation("system name required"));
    }
    let password = input.password.clone().filter(|p| !p.trim().is_empty());
    if input.is_password_protected && password.is_none() {
        return Err(ServiceError::validation("password required for a protected topic"));
    }
    let mut q = topic::Entity::find().filter(topic::Column::SystemName.eq(system_name.as_str()));
    if let Some(id) = except {
        q = q.filter(topic::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("topic {system_name} already exists")));
    }
    Ok(Validated { system_name, password: if input.is_password_protected { password } else { None } })
}

pub async fn list_topics(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<topic::Model>, ServiceError> {
    let mut q = topic::Entity::find();
    if let Some(term) = cmd.search_term() {
        q = q.filter(topic::Column::SystemName.contains(term).or(topic::Column::Title.contains(term)));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(topic::Column::SystemName);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_topic(db: &DatabaseConnection, id: i32) -> Result<TopicDetails, ServiceError> {
    let topic = topic::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("topic"))?;
    Ok(TopicDetails {
        locales: localization::get_localized(db, ENTITY_NAME, id).await?,
        store_ids: mapping::get_store_ids(db, ENTITY_NAME, id).await?,
        role_ids: mapping::get_role_ids(db, ENTITY_NAME, id).await?,
        topic,
    })
}

pub async fn create_topic(db: &DatabaseConnection, input: TopicInput) -> Result<TopicDetails, ServiceError> {
    let v = validate(db, &input, None).await?;
    let txn = db.begin().await?;
    let created = topic::ActiveModel {
        system_name: Set(v.system_name),
        title: Set(input.title),
        body: Set(input.body),
        include_in_sitemap: Set(input.include_in_sitemap),
        is_password_protected: Set(input.is_password_protected),
        password: Set(v.password),
        is_published: Set(input.is_published),
        is_system: Set(false),
        limited_to_stores: Set(false),
        subject_to_acl: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, ENTITY_NAME, created.id, &input.locales).await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, created.id, &input.store_ids).await?;
    let acl = mapping::save_acl(&txn, ENTITY_NAME, created.id, &input.role_ids).await?;
    if limited || acl {
        let mut am: topic::ActiveModel = created.clone().into();
        am.limited_to_stores = Set(limited);
        am.subject_to_acl = Set(acl);
        am.update(&txn).await?;
    }
    txn.commit().await?;
    get_topic(db, created.id).await
}

pub async fn update_topic(db: &DatabaseConnection, id: i32, input: TopicInput) -> Result<TopicDetails, ServiceError> {
    let current = get_topic(db, id).await?.topic;
    let v = validate(db, &input, Some(id)).await?;
    let txn = db.begin().await?;
    localization::save_localized(&txn, ENTITY_NAME, id, &input.locales).await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, id, &input.store_ids).await?;
    let acl = mapping::save_acl(&txn, ENTITY_NAME, id, &input.role_ids).await?;
    let mut am: topic::ActiveModel = current.into();
    am.system_name = Set(v.system_name);
    am.title = Set(input.title);
    am.body = Set(input.body);
    am.include_in_sitemap = Set(input.include_in_sitemap);
    am.is_password_protected = Set(input.is_password_protected);
    am.password = Set(v.password);
    am.is_published = Set(input.is_published);
    am.limited_to_stores = Set(limited);
    am.subject_to_acl = Set(acl);
    am.update(&txn).await?;
    txn.commit().await?;
    get_topic(db, id).await
}

pub async fn delete_topic(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let current = get_topic(db, id).await?.topic;
    if current.is_system {
        return Err(ServiceError::conflict(format!("system topic {} cannot be deleted", current.system_name)));
    }
    let txn = db.begin().await?;
    localization::delete_localized(&txn, ENTITY_NAME, id).await?;
    mapping::delete_store_mappings(&txn, ENTITY_NAME, id).await?;
    mapping::delete_acl(&txn, ENTITY_NAME, id).await?;
    topic::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{create_role, RoleInput};
    use crate::test_support::{get_db, unique};

    #[tokio::test]
    async fn topic_rules() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let base = unique("about");
        let role = create_role(&db, RoleInput::named("Registered")).await?;
        let t = create_topic(&db, TopicInput {
            system_name: format!("  {base} us "),
            title: Some("About".into()),
            role_ids: vec![role.id],
            ..Default::default()
        })
        .await?;
        assert_eq!(t.topic.system_name, format!("{base}_us"));
        assert!(t.topic.subject_to_acl);
        assert_eq!(t.role_ids, vec![role.id]);

        let dup = create_topic(&db, TopicInput { system_name: format!("{base} us"), ..Default::default() }).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Conflict(_)));

        let locked = TopicInput { system_name: unique("secret"), is_password_protected: true, ..Default::default() };
        assert!(create_topic(&db, locked.clone()).await.is_err());
        let secret = create_topic(&db, TopicInput { password: Some("hunter2".into()), ..locked }).await?;
        assert_eq!(secret.topic.password.as_deref(), Some("hunter2"));

        let mut am: topic::ActiveModel = secret.topic.clone().into();
        am.is_system = Set(true);
        am.update(&db).await?;
        assert!(delete_topic(&db, secret.topic.id).await.is_err());
        delete_topic(&db, t.topic.id).await?;
        Ok(())
    }
}
