//! Remote select-list options for rule values.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select};
use serde::{Deserialize, Serialize};

use common::types::SelectOption;
use models::{category, country, currency, customer_role, manufacturer, product, store};

use super::descriptor::DataSource;
use crate::errors::ServiceError;
use crate::grid::MAX_PAGE;

pub const OPTIONS_PAGE_SIZE: u64 = 20;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteOptions {
    pub options: Vec<SelectOption>,
    pub has_more: bool,
}

/// Row offset of a 1-based options page.
fn page_offset(page: u64) -> u64 {
    (page.clamp(1, MAX_PAGE) - 1) * OPTIONS_PAGE_SIZE
}

async fn page_of<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page: u64,
    to_option: impl Fn(E::Model) -> SelectOption,
) -> Result<RemoteOptions, ServiceError>
where
    E: EntityTrait,
{
    let rows = select
        .offset(page_offset(page))
        .limit(OPTIONS_PAGE_SIZE + 1)
        .all(db)
        .await?;
    let has_more = rows.len() as u64 > OPTIONS_PAGE_SIZE;
    Ok(RemoteOptions {
        options: rows.into_iter().take(OPTIONS_PAGE_SIZE as usize).map(to_option).collect(),
        has_more,
    })
}

/// One page of options, optionally filtered by a name search.
pub async fn options(db: &DatabaseConnection, source: DataSource, search: Option<&str>, page: u64) -> Result<RemoteOptions, ServiceError> {
    let term = search.map(str::trim).filter(|s| !s.is_empty());
    match source {
        DataSource::CustomerRole => {
            let mut q = customer_role::Entity::find().order_by_asc(customer_role::Column::Name);
            if let Some(t) = term {
                q = q.filter(customer_role::Column::Name.contains(t));
            }
            page_of(db, q, page, |m| SelectOption::new(m.id, m.name)).await
        }
        DataSource::Country => {
            let mut q = country::Entity::find().order_by_asc(country::Column::DisplayOrder).order_by_asc(country::Column::Name);
            if let Some(t) = term {
                q = q.filter(country::Column::Name.contains(t));
            }
            page_of(db, q, page, |m| SelectOption::new(m.id, m.name)).await
        }
        DataSource::Category => {
            let mut q = category::Entity::find().filter(category::Column::Deleted.eq(false)).order_by_asc(category::Column::Name);
            if let Some(t) = term {
                q = q.filter(category::Column::Name.contains(t));
            }
            page_of(db, q, page, |m| SelectOption::new(m.id, m.name)).await
        }
        DataSource::Manufacturer => {
            let mut q = manufacturer::Entity::find()
                .filter(manufacturer::Column::Deleted.eq(false))
                .order_by_asc(manufacturer::Column::Name);
            if let Some(t) = term {
                q = q.filter(manufacturer::Column::Name.contains(t));
            }
            page_of(db, q, page, |m| SelectOption::new(m.id, m.name)).await
        }
        DataSource::Product => {
            let mut q = product::Entity::find().filter(product::Column::Deleted.eq(false)).order_by_asc(product::Column::Name);
            if let Some(t) = term {
                q = q.filter(product::Column::Name.contains(t).or(product::Column::Sku.eq(t)));
            }
            page_of(db, q, page, |m| SelectOption::new(m.id, m.name)).await
        }
        DataSource::Currency => {
            let mut q = currency::Entity::find().order_by_asc(currency::Column::CurrencyCode);
            if let Some(t) = term {
                q = q.filter(currency::Column::Name.contains(t).or(currency::Column::CurrencyCode.eq(t.to_ascii_uppercase())));
            }
            page_of(db, q, page, |m| SelectOption::new(m.id, format!("{} ({})", m.name, m.currency_code))).await
        }
        DataSource::Store => {
            let mut q = store::Entity::find().order_by_asc(store::Column::DisplayOrder).order_by_asc(store::Column::Name);
            if let Some(t) = term {
                q = q.filter(store::Column::Name.contains(t));
            }
            page_of(db, q, page, |m| SelectOption::new(m.id, m.name)).await
        }
    }
}

/// Resolves selected ids to display texts, in the order given. Unknown ids are dropped.
pub async fn display_names(db: &DatabaseConnection, source: DataSource, ids: &[i32]) -> Result<Vec<SelectOption>, ServiceError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids_iter = ids.iter().copied();
    let found: Vec<(i32, String)> = match source {
        DataSource::CustomerRole => customer_role::Entity::find()
            .filter(customer_role::Column::Id.is_in(ids_iter))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect(),
        DataSource::Country => country::Entity::find()
            .filter(country::Column::Id.is_in(ids_iter))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect(),
        DataSource::Category => category::Entity::find()
            .filter(category::Column::Id.is_in(ids_iter))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect(),
        DataSource::Manufacturer => manufacturer::Entity::find()
            .filter(manufacturer::Column::Id.is_in(ids_iter))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect(),
        DataSource::Product => product::Entity::find()
            .filter(product::Column::Id.is_in(ids_iter))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect(),
        DataSource::Currency => currency::Entity::find()
            .filter(currency::Column::Id.is_in(ids_iter))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, format!("{} ({})", m.name, m.currency_code)))
            .collect(),
        DataSource::Store => store::Entity::find()
            .filter(store::Column::Id.is_in(ids_iter))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect(),
    };
    Ok(ids
        .iter()
        .filter_map(|id| found.iter().find(|(fid, _)| fid == id))
        .map(|(id, text)| SelectOption::new(id, text.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::{create_role, RoleInput};
    use crate::test_support::get_db;

    #[test]
    fn page_offsets_stay_in_range() {
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(3), 2 * OPTIONS_PAGE_SIZE);
        assert_eq!(page_offset(u64::MAX), (MAX_PAGE - 1) * OPTIONS_PAGE_SIZE);
    }

    #[tokio::test]
    async fn pages_and_resolves_roles() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let mut ids = Vec::new();
        for i in 0..25 {
            ids.push(create_role(&db, RoleInput::named(&format!("Role {i:02}"))).await?.id);
        }
        let first = options(&db, DataSource::CustomerRole, None, 1).await?;
        assert_eq!(first.options.len(), 20);
        assert!(first.has_more);
        let second = options(&db, DataSource::CustomerRole, None, 2).await?;
        assert_eq!(second.options.len(), 5);
        assert!(!second.has_more);

        let searched = options(&db, DataSource::CustomerRole, Some("Role 1"), 1).await?;
        assert_eq!(searched.options.len(), 10);

        let names = display_names(&db, DataSource::CustomerRole, &[ids[3], 9999, ids[0]]).await?;
        assert_eq!(names, vec![SelectOption::new(ids[3], "Role 03"), SelectOption::new(ids[0], "Role 00")]);
        Ok(())
    }
}
