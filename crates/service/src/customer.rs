//! Customers and customer roles.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use models::{customer, customer_role, customer_role_mapping};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleInput {
    pub name: String,
    #[serde(default)]
    pub system_name: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub tax_exempt: bool,
}

fn default_true() -> bool { true }

#[cfg(test)]
impl RoleInput {
    pub fn named(name: &str) -> Self {
        Self { name: name.into(), system_name: None, active: true, tax_exempt: false }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerInput {
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub is_tax_exempt: bool,
    #[serde(default)]
    pub billing_country_id: Option<i32>,
    #[serde(default)]
    pub admin_comment: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<i32>,
}

#[cfg(test)]
impl CustomerInput {
    pub fn email(email: &str) -> Self {
        Self { email: email.into(), username: None, active: true, is_tax_exempt: false, billing_country_id: None, admin_comment: None, role_ids: vec![] }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub active: Option<bool>,
    pub is_tax_exempt: Option<bool>,
    pub billing_country_id: Option<Option<i32>>,
    pub admin_comment: Option<Option<String>>,
    pub role_ids: Option<Vec<i32>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(flatten)]
    pub customer: customer::Model,
    pub role_ids: Vec<i32>,
}

// ----- roles -----

pub async fn list_roles(db: &DatabaseConnection) -> Result<Vec<customer_role::Model>, ServiceError> {
    Ok(customer_role::Entity::find().order_by_asc(customer_role::Column::Name).all(db).await?)
}

pub async fn create_role(db: &DatabaseConnection, input: RoleInput) -> Result<customer_role::Model, ServiceError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("role name required"));
    }
    let am = customer_role::ActiveModel {
        name: Set(name.to_string()),
        system_name: Set(input.system_name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())),
        active: Set(input.active),
        is_system_role: Set(false),
        tax_exempt: Set(input.tax_exempt),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn update_role(db: &DatabaseConnection, id: i32, input: RoleInput) -> Result<customer_role::Model, ServiceError> {
    let role = customer_role::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("customer role"))?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("role name required"));
    }
    let is_system = role.is_system_role;
    let mut am: customer_role::ActiveModel = role.into();
    am.name = Set(name.to_string());
    if !is_system {
        am.system_name = Set(input.system_name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
    }
    am.active = Set(input.active);
    am.tax_exempt = Set(input.tax_exempt);
    Ok(am.update(db).await?)
}

pub async fn delete_role(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let role = customer_role::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("customer role"))?;
    if role.is_system_role {
        return Err(ServiceError::conflict("system roles cannot be deleted"));
    }
    customer_role::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

// ----- customers -----

async fn ensure_email_free(db: &DatabaseConnection, email: &str, except: Option<i32>) -> Result<(), ServiceError> {
    let mut q = customer::Entity::find().filter(customer::Column::Email.eq(email));
    if let Some(id) = except {
        q = q.filter(customer::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("email {email} already registered")));
    }
    Ok(())
}

async fn set_roles<C: ConnectionTrait>(db: &C, customer_id: i32, role_ids: &[i32]) -> Result<(), ServiceError> {
    let wanted: BTreeSet<i32> = role_ids.iter().copied().collect();
    let existing = customer_role_mapping::Entity::find()
        .filter(customer_role_mapping::Column::CustomerId.eq(customer_id))
        .all(db)
        .await?;
    let have: BTreeSet<i32> = existing.iter().map(|m| m.customer_role_id).collect();
    for m in existing.iter().filter(|m| !wanted.contains(&m.customer_role_id)) {
        customer_role_mapping::Entity::delete_by_id(m.id).exec(db).await?;
    }
    for role_id in wanted.difference(&have) {
        customer_role_mapping::ActiveModel {
            customer_id: Set(customer_id),
            customer_role_id: Set(*role_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

pub async fn role_ids_of<C: ConnectionTrait>(db: &C, customer_id: i32) -> Result<Vec<i32>, ServiceError> {
    let rows = customer_role_mapping::Entity::find()
        .filter(customer_role_mapping::Column::CustomerId.eq(customer_id))
        .order_by_asc(customer_role_mapping::Column::CustomerRoleId)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|m| m.customer_role_id).collect())
}

pub async fn list_customers(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<customer::Model>, ServiceError> {
    let mut q = customer::Entity::find().filter(customer::Column::Deleted.eq(false));
    if let Some(term) = cmd.search_term() {
        q = q.filter(customer::Column::Email.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_desc(customer::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_customer(db: &DatabaseConnection, id: i32) -> Result<CustomerDetails, ServiceError> {
    let customer = customer::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|c| !c.deleted)
        .ok_or_else(|| ServiceError::not_found("customer"))?;
    let role_ids = role_ids_of(db, id).await?;
    Ok(CustomerDetails { customer, role_ids })
}

pub async fn create_customer(db: &DatabaseConnection, input: CustomerInput) -> Result<CustomerDetails, ServiceError> {
    customer::validate_email(&input.email)?;
    let email = input.email.trim().to_lowercase();
    ensure_email_free(db, &email, None).await?;
    let now = Utc::now();
    let txn = db.begin().await?;
    let created = customer::ActiveModel {
        email: Set(email),
        username: Set(input.username.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())),
        active: Set(input.active),
        deleted: Set(false),
        is_tax_exempt: Set(input.is_tax_exempt),
        billing_country_id: Set(input.billing_country_id),
        admin_comment: Set(input.admin_comment),
        created_on_utc: Set(now.into()),
        last_activity_utc: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    set_roles(&txn, created.id, &input.role_ids).await?;
    txn.commit().await?;
    get_customer(db, created.id).await
}

pub async fn update_customer(db: &DatabaseConnection, id: i32, input: CustomerUpdate) -> Result<CustomerDetails, ServiceError> {
    let current = get_customer(db, id).await?;
    let txn = db.begin().await?;
    let mut am: customer::ActiveModel = current.customer.into();
    if let Some(a) = input.active { am.active = Set(a); }
    if let Some(t) = input.is_tax_exempt { am.is_tax_exempt = Set(t); }
    if let Some(c) = input.billing_country_id { am.billing_country_id = Set(c); }
    if let Some(c) = input.admin_comment { am.admin_comment = Set(c); }
    am.update(&txn).await?;
    if let Some(roles) = input.role_ids {
        set_roles(&txn, id, &roles).await?;
    }
    txn.commit().await?;
    get_customer(db, id).await
}

/// Marks the customer inactive; the row is kept for order history.
pub async fn deactivate_customer(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    let current = get_customer(db, id).await?;
    let mut am: customer::ActiveModel = current.customer.into();
    am.active = Set(false);
    am.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, unique};

    #[tokio::test]
    async fn customer_crud_with_roles() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let r1 = create_role(&db, RoleInput::named("Registered")).await?;
        let r2 = create_role(&db, RoleInput::named("VIP")).await?;
        let email = format!("{}@example.com", unique("buyer"));

        let mut input = CustomerInput::email(&email.to_uppercase());
        input.role_ids = vec![r1.id];
        let c = create_customer(&db, input).await?;
        assert_eq!(c.customer.email, email);
        assert_eq!(c.role_ids, vec![r1.id]);

        let dup = create_customer(&db, CustomerInput::email(&email)).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Conflict(_)));

        let upd = update_customer(&db, c.customer.id, CustomerUpdate { is_tax_exempt: Some(true), role_ids: Some(vec![r2.id]), ..Default::default() }).await?;
        assert!(upd.customer.is_tax_exempt);
        assert_eq!(upd.role_ids, vec![r2.id]);

        deactivate_customer(&db, c.customer.id).await?;
        assert!(!get_customer(&db, c.customer.id).await?.customer.active);
        Ok(())
    }

    #[tokio::test]
    async fn system_role_cannot_be_deleted() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let role = create_role(&db, RoleInput::named("Administrators")).await?;
        let mut am: customer_role::ActiveModel = role.clone().into();
        am.is_system_role = Set(true);
        am.update(&db).await?;
        assert!(matches!(delete_role(&db, role.id).await.unwrap_err(), ServiceError::Conflict(_)));
        Ok(())
    }
}
