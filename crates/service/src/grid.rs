//! Grid commands: paging, sorting and search input shared by list endpoints.

use std::str::FromStr;

use sea_orm::{ConnectionTrait, EntityTrait, FromQueryResult, Order, PaginatorTrait, QueryOrder, Select};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Highest page index honored; larger requests land on this page.
pub const MAX_PAGE: u64 = u32::MAX as u64;

/// Paging/sorting request, deserialized from the query string.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct GridCommand {
    /// 1-based page index
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub page_size: u64,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub sort_desc: bool,
    #[serde(default)]
    pub search: Option<String>,
}

impl GridCommand {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size, ..Default::default() }
    }

    pub fn sorted_by(mut self, column: &str, desc: bool) -> Self {
        self.sort = Some(column.to_string());
        self.sort_desc = desc;
        self
    }

    /// Clamp to sane defaults. Returns `(page, page_size)` with a 1-based page.
    pub fn normalize(&self) -> (u64, u64) {
        let page = self.page.clamp(1, MAX_PAGE);
        let page_size = match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.clamp(1, MAX_PAGE_SIZE),
        };
        (page, page_size)
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// One page of rows plus the unpaged total.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GridModel<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> GridModel<T> {
    pub fn empty(cmd: &GridCommand) -> Self {
        let (page, page_size) = cmd.normalize();
        Self { rows: Vec::new(), total: 0, page, page_size }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> GridModel<U> {
        GridModel { rows: self.rows.into_iter().map(f).collect(), total: self.total, page: self.page, page_size: self.page_size }
    }

    /// Page over an already materialized list.
    pub fn from_vec(items: Vec<T>, cmd: &GridCommand) -> Self {
        let (page, page_size) = cmd.normalize();
        let total = items.len() as u64;
        let rows = items
            .into_iter()
            .skip(usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX))
            .take(page_size as usize)
            .collect();
        Self { rows, total, page, page_size }
    }
}

/// Apply the command's sort to `select`, then fetch one page and the total count.
pub async fn fetch_grid<'db, E, C>(db: &'db C, select: Select<E>, cmd: &GridCommand) -> Result<GridModel<E::Model>, ServiceError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Sized + Send + Sync + 'db,
{
    let (page, page_size) = cmd.normalize();
    let select = match cmd.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => {
            let col = E::Column::from_str(name)
                .map_err(|_| ServiceError::validation(format!("unknown sort column: {name}")))?;
            select.order_by(col, if cmd.sort_desc { Order::Desc } else { Order::Asc })
        }
        None => select,
    };
    let paginator = select.paginate(db, page_size);
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;
    Ok(GridModel { rows, total, page, page_size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (page, size) = GridCommand::default().normalize();
        assert_eq!(page, 1);
        assert_eq!(size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (page, size) = GridCommand::new(5, 1000).normalize();
        assert_eq!(page, 5);
        assert_eq!(size, MAX_PAGE_SIZE);
    }

    #[test]
    fn blank_search_is_none() {
        let cmd = GridCommand { search: Some("   ".into()), ..Default::default() };
        assert_eq!(cmd.search_term(), None);
        let cmd = GridCommand { search: Some(" shoes ".into()), ..Default::default() };
        assert_eq!(cmd.search_term(), Some("shoes"));
    }

    #[test]
    fn from_vec_pages_in_memory() {
        let g = GridModel::from_vec((1..=7).collect::<Vec<i32>>(), &GridCommand::new(2, 3));
        assert_eq!(g.rows, vec![4, 5, 6]);
        assert_eq!(g.total, 7);
        let g = GridModel::from_vec((1..=7).collect::<Vec<i32>>(), &GridCommand::new(3, 3));
        assert_eq!(g.rows, vec![7]);
    }

    #[test]
    fn huge_page_index_is_clamped() {
        let cmd = GridCommand::new(u64::MAX, 25);
        assert_eq!(cmd.normalize(), (MAX_PAGE, 25));
        let g = GridModel::from_vec((1..=7).collect::<Vec<i32>>(), &cmd);
        assert!(g.rows.is_empty());
        assert_eq!(g.total, 7);
        assert_eq!(g.page, MAX_PAGE);
    }
}
