use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use models::{country, customer};

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};
use crate::mapping;

pub const ENTITY_NAME: &str = "Country";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CountryInput {
    pub name: String,
    pub two_letter_iso_code: String,
    pub three_letter_iso_code: String,
    #[serde(default)]
    pub numeric_iso_code: i32,
    #[serde(default = "yes")]
    pub allows_billing: bool,
    #[serde(default = "yes")]
    pub allows_shipping: bool,
    #[serde(default)]
    pub subject_to_vat: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub store_ids: Vec<i32>,
}

fn yes() -> bool { true }

#[cfg(test)]
impl CountryInput {
    pub fn iso(name: &str, two: &str, three: &str) -> Self {
        Self {
            name: name.into(),
            two_letter_iso_code: two.into(),
            three_letter_iso_code: three.into(),
            allows_billing: true,
            allows_shipping: true,
            published: true,
            ..Default::default()
        }
    }
}

struct Validated {
    name: String,
    two: String,
    three: String,
}

async fn validate(db: &DatabaseConnection, input: &CountryInput, except: Option<i32>) -> Result<Validated, ServiceError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("country name required"));
    }
    let two = country::validate_iso(&input.two_letter_iso_code, 2)?;
    let three = country::validate_iso(&input.three_letter_iso_code, 3)?;
    if !(0..=999).contains(&input.numeric_iso_code) {
        return Err(ServiceError::validation("numeric ISO code must be in 0..=999"));
    }
    let mut q = country::Entity::find().filter(country::Column::TwoLetterIsoCode.eq(two.as_str()));
    if let Some(id) = except {
        q = q.filter(country::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::conflict(format!("country {two} already exists")));
    }
    Ok(Validated { name: name.to_string(), two, three })
}

pub async fn list_countries(db: &DatabaseConnection, cmd: &GridCommand) -> Result<GridModel<country::Model>, ServiceError> {
    let mut q = country::Entity::find();
    if let Some(term) = cmd.search_term() {
        q = q.filter(country::Column::Name.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_asc(country::Column::DisplayOrder).order_by_asc(country::Column::Name);
    }
    fetch_grid(db, q, cmd).await
}

pub async fn get_country(db: &DatabaseConnection, id: i32) -> Result<country::Model, ServiceError> {
    country::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("country"))
}

#[instrument(skip(db, input), fields(iso = %input.two_letter_iso_code))]
pub async fn create_country(db: &DatabaseConnection, input: CountryInput) -> Result<country::Model, ServiceError> {
    let v = validate(db, &input, None).await?;
    let txn = db.begin().await?;
    let created = country::ActiveModel {
        name: Set(v.name),
        two_letter_iso_code: Set(v.two),
        three_letter_iso_code: Set(v.three),
        numeric_iso_code: Set(input.numeric_iso_code),
        allows_billing: Set(input.allows_billing),
        allows_shipping: Set(input.allows_shipping),
        subject_to_vat: Set(input.subject_to_vat),
        published: Set(input.published),
        display_order: Set(input.display_order),
        limited_to_stores: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let created = if mapping::save_store_mappings(&txn, ENTITY_NAME, created.id, &input.store_ids).await? {
        let mut am: country::ActiveModel = created.into();
        am.limited_to_stores = Set(true);
        am.update(&txn).await?
    } else {
        created
    };
    txn.commit().await?;
    Ok(created)
}

pub async fn update_country(db: &DatabaseConnection, id: i32, input: CountryInput) -> Result<country::Model, ServiceError> {
    let current = get_country(db, id).await?;
    let v = validate(db, &input, Some(id)).await?;
    let txn = db.begin().await?;
    let limited = mapping::save_store_mappings(&txn, ENTITY_NAME, id, &input.store_ids).await?;
    let mut am: country::ActiveModel = current.into();
    am.name = Set(v.name);
    am.two_letter_iso_code = Set(v.two);
    am.three_letter_iso_code = Set(v.three);
    am.numeric_iso_code = Set(input.numeric_iso_code);
    am.allows_billing = Set(input.allows_billing);
    am.allows_shipping = Set(input.allows_shipping);
    am.subject_to_vat = Set(input.subject_to_vat);
    am.published = Set(input.published);
    am.display_order = Set(input.display_order);
    am.limited_to_stores = Set(limited);
    let updated = am.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Refused while any customer bills to the country.
pub async fn delete_country(db: &DatabaseConnection, id: i32) -> Result<(), ServiceError> {
    get_country(db, id).await?;
    let used = customer::Entity::find()
        .filter(customer::Column::BillingCountryId.eq(id))
        .count(db)
        .await?;
    if used > 0 {
        return Err(ServiceError::conflict(format!("country is referenced by {used} customer(s)")));
    }
    let txn = db.begin().await?;
    mapping::delete_store_mappings(&txn, ENTITY_NAME, id).await?;
    country::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Bulk publish or unpublish. Returns the number of rows touched.
pub async fn set_published(db: &DatabaseConnection, ids: &[i32], published: bool) -> Result<u64, ServiceError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let res = country::Entity::update_many()
        .col_expr(country::Column::Published, Expr::value(published))
        .filter(country::Column::Id.is_in(ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{create_customer, update_customer, CustomerInput, CustomerUpdate};
    use crate::test_support::get_db;

    #[tokio::test]
    async fn iso_codes_are_normalized_and_unique() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let de = create_country(&db, CountryInput::iso("Germany", "de", "deu")).await?;
        assert_eq!(de.two_letter_iso_code, "DE");
        assert_eq!(de.three_letter_iso_code, "DEU");

        let dup = create_country(&db, CountryInput::iso("Deutschland", "DE", "DEU")).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Conflict(_)));
        assert!(create_country(&db, CountryInput::iso("Bad", "D", "DEU")).await.is_err());
        assert!(create_country(&db, CountryInput::iso("Bad", "XX", "XXXX")).await.is_err());

        update_country(&db, de.id, CountryInput::iso("Germany", "DE", "DEU")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn referenced_country_cannot_be_deleted() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let fr = create_country(&db, CountryInput::iso("France", "FR", "FRA")).await?;
        let it = create_country(&db, CountryInput::iso("Italy", "IT", "ITA")).await?;
        let c = create_customer(&db, CustomerInput::email("anne@example.fr")).await?;
        update_customer(&db, c.customer.id, CustomerUpdate { billing_country_id: Some(Some(fr.id)), ..Default::default() }).await?;

        assert!(matches!(delete_country(&db, fr.id).await.unwrap_err(), ServiceError::Conflict(_)));
        delete_country(&db, it.id).await?;

        assert_eq!(set_published(&db, &[fr.id], false).await?, 1);
        assert!(!get_country(&db, fr.id).await?.published);
        Ok(())
    }
}
