//! Message templates and token previews.

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use models::message_template::{self, ENTITY_NAME};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::localization::{self, LocalizedValue};
use crate::mapping;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MessageTemplateInput {
    pub name: String,
    pub to_address: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub email_account_id: Option<i32>,
    #[serde(default)]
    pub locales: Vec<LocalizedValue>,
    #[serde(default)]
    pub store_ids: Vec<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageTemplateDetails {
    #[serde(flatten)]
    pub template: message_template::Model,
    pub locales: Vec<LocalizedValue>,
    pub store_ids: Vec<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplatePreview {
    pub subject: String,
    pub body: String,
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '_'
}

/// Replaces `%Token.Name%` placeholders. Unknown tokens are kept verbatim.
pub fn replace_tokens(text: &str, tokens: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 && after[..end].chars().all(is_token_char) => {
                let name = &after[..end];
                match tokens.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn validate(input: &MessageTemplateInput) -> Result<(), ServiceError> {
    if input.name.trim().is_empty() {
        return Err(ServiceError::validation("template name required"));
    }
    if input.to_address.trim().is_empty() {
        return Err(ServiceError::validation("to address required"));
    }
    if input.subject.trim().is_empty() {
        return Err(ServiceError::validation("subject required"));
    }
    Ok(())
}

pub async fn list_templates(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<message_template::Model>, ServiceError> {
    let mut q = message_template::Entity::find();
    if let Some(term) = cmd.search_term() {
        q = q.filter(message_template::Column::Name.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(message_template::Column::Name);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_template(db: &DatabaseConnection, id: i32) -> Result<MessageTemplateDetails, ServiceError> {
    let template = message_template::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("message template"))?;
    Ok(MessageTemplateDetails {
        locales: localization::get_localized(db, ENTITY_NAME, id).await?,
        store_ids: mapping::get_store_ids(db, ENTITY_NAME, id).await?,
        template,
    })
}

pub async fn create_template(db: &DatabaseConnection, input: MessageTemplateInput) -> Result<MessageTemplateDetails, ServiceError> {
    validate(&input)?;
    let txn = db.begin().await?;
    let created = message_template::ActiveModel {
        name: Set(input.name.trim().to_string()),
        to_address: Set(input.to_address.trim().to_string()),
        reply_to: Set(input.reply_to),
        subject: Set(input.subject),
        body: Set(input.body),
        is_active: Set(input.is_active),
        email_account_id: Set(input.email_account_id),
        limited_to_stores: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, ENTITY_NAME, created.id, &input.locales).await?;
    if mapping::save_store_mappings(&txn, ENTITY_NAME, created.id, &input.store_ids).await? {
        let mut am: message_template::ActiveModel = created.clone().into();
        am.limited_to_stores = Set(true);
        am.update(&txn).await?;
    }
    txn.commit().await?;
    get_template(db, created.id).await
}

pub async fn update_template(db: &DatabaseConnection, id: i32, input: MessageTemplateInput) -> Result<MessageTemplateDetails, ServiceError> {
    validate(&input)?;
    let current = get_template(db, id).await?.template;
    let txn = db.begin().await?;
    localization::save_localized(&txn, ENTITY_NAME, id, &input.locales).await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, id, &input.store_ids).await?;
    let mut am: message_template::ActiveModel = current.into();
    am.name = Set(input.name.trim().to_string());
    am.to_address = Set(input.to_address.trim().to_string());
    am.reply_to = Set(input.reply_to);
    am.subject = Set(input.subject);
    am.body = Set(input.body);
    am.is_active = Set(input.is_active);
    am.email_account_id = Set(input.email_account_id);
    am.limited_to_stores = Set(limited);
    am.update(&txn).await?;
    txn.commit().await?;
    get_template(db, id).await
}

pub async fn delete_template(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    get_template(db, id).await?;
    let txn = db.begin().await?;
    localization::delete_localized(&txn, ENTITY_NAME, id).await?;
    mapping::delete_store_mappings(&txn, ENTITY_NAME, id).await?;
    message_template::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Duplicates a template as inactive, with its localized values and store mappings.
pub async fn copy_template(db: &DatabaseConnection, id: i32) -> Result<MessageTemplateDetails, ServiceError> {
    let source = get_template(db, id).await?;
    let base = format!("Copy of {}", source.template.name);
    let mut name = base.clone();
    let mut n = 2;
    while message_template::Entity::find()
        .filter(message_template::Column::Name.eq(name.as_str()))
        .count(db)
        .await?
        > 0
    {
        name = format!("{base} ({n})");
        n += 1;
    }
    let txn = db.begin().await?;
    let created = message_template::ActiveModel {
        name: Set(name),
        to_address: Set(source.template.to_address.clone()),
        reply_to: Set(source.template.reply_to.clone()),
        subject: Set(source.template.subject.clone()),
        body: Set(source.template.body.clone()),
        is_active: Set(false),
        email_account_id: Set(source.template.email_account_id),
        limited_to_stores: Set(source.template.limited_to_stores),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    localization::save_localized(&txn, ENTITY_NAME, created.id, &source.locales).await?;
    mapping::save_store_mappings(&txn, ENTITY_NAME, created.id, &source.store_ids).await?;
    txn.commit().await?;
    get_template(db, created.id).await
}

pub async fn preview(db: &DatabaseConnection, id: i32, tokens: &HashMap<String, String>) -> Result<TemplatePreview, ServiceError> {
    let t = get_template(db, id).await?.template;
    Ok(TemplatePreview { subject: replace_tokens(&t.subject, tokens), body: replace_tokens(&t.body, tokens) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::{create_language, LanguageInput};
    use crate::store::{create_store, StoreInput};
    use crate::test_support::get_db;

    fn tokens() -> HashMap<String, String> {
        HashMap::from([("Customer.FullName".to_string(), "Jane Doe".to_string()), ("Store.Name".to_string(), "Shop".to_string())])
    }

    #[test]
    fn replaces_known_tokens_only() {
        assert_eq!(replace_tokens("Hello %Customer.FullName%!", &tokens()), "Hello Jane Doe!");
        assert_eq!(replace_tokens("%Order.Number% at %Store.Name%", &tokens()), "%Order.Number% at Shop");
        assert_eq!(replace_tokens("50% off %Store.Name%", &tokens()), "50% off Shop");
        assert_eq!(replace_tokens("100%", &tokens()), "100%");
        assert_eq!(replace_tokens("%%", &tokens()), "%%");
    }

    #[tokio::test]
    async fn copy_is_inactive_with_locales() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let lang = create_language(&db, LanguageInput { name: "Deutsch".into(), culture: "de-DE".into(), published: true, display_order: 1 }).await?;
        let store = create_store(&db, StoreInput::named("Main", "https://example.com")).await?;
        let t = create_template(&db, MessageTemplateInput {
            name: "OrderPlaced.CustomerNotification".into(),
            to_address: "%Customer.Email%".into(),
            subject: "Thanks %Customer.FullName%".into(),
            body: "Welcome to %Store.Name%".into(),
            is_active: true,
            locales: vec![LocalizedValue::new(lang.id, "Subject", "Danke %Customer.FullName%")],
            store_ids: vec![store.id],
            ..Default::default()
        })
        .await?;

        let copy = copy_template(&db, t.template.id).await?;
        assert!(!copy.template.is_active);
        assert_eq!(copy.template.name, "Copy of OrderPlaced.CustomerNotification");
        assert_eq!(copy.locales.len(), 1);
        assert_eq!(copy.store_ids, vec![store.id]);
        assert!(copy.template.limited_to_stores);

        let second = copy_template(&db, t.template.id).await?;
        assert_eq!(second.template.name, "Copy of OrderPlaced.CustomerNotification (2)");

        let p = preview(&db, t.template.id, &tokens()).await?;
        assert_eq!(p.subject, "Thanks Jane Doe");
        assert_eq!(p.body, "Welcome to Shop");
        Ok(())
    }
}
