//! Admin activity log.

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::debug;

use models::activity_log;

use crate::errors::ServiceError;
use crate::grid::{fetch_grid, GridCommand, GridModel};

pub async fn log_activity<C: ConnectionTrait>(
    db: &C,
    admin_id: Option<i32>,
    activity_type: &str,
    entity_name: Option<&str>,
    entity_id: Option<i32>,
    comment: &str,
) -> Result<activity_log::Model, ServiceError> {
    debug!(activity_type, ?entity_name, ?entity_id, "activity");
    let am = activity_log::ActiveModel {
        activity_type: Set(activity_type.to_string()),
        admin_user_id: Set(admin_id),
        entity_name: Set(entity_name.map(str::to_string)),
        entity_id: Set(entity_id),
        comment: Set(comment.to_string()),
        created_on_utc: Set(Utc::now().into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn list_activity(
    db: &DatabaseConnection,
    activity_type: Option<&str>,
    cmd: &GridCommand,
) -> Result<GridModel<activity_log::Model>, ServiceError> {
    let mut q = activity_log::Entity::find();
    if let Some(t) = activity_type.filter(|t| !t.is_empty()) {
        q = q.filter(activity_log::Column::ActivityType.eq(t));
    }
    if let Some(term) = cmd.search_term() {
        q = q.filter(activity_log::Column::Comment.contains(term));
    }
    if cmd.sort.is_none() {
        q = q.order_by_desc(activity_log::Column::CreatedOnUtc).order_by_desc(activity_log::Column::Id);
    }
    fetch_grid(db, q, cmd).await
}

/// Removes entries older than `days`; returns the number deleted.
pub async fn delete_older_than(db: &DatabaseConnection, days: i64) -> Result<u64, ServiceError> {
    if days < 0 {
        return Err(ServiceError::validation("days must not be negative"));
    }
    let cutoff = Utc::now() - Duration::days(days);
    let res = activity_log::Entity::delete_many()
        .filter(activity_log::Column::CreatedOnUtc.lt(cutoff.fixed_offset()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, unique};

    #[tokio::test]
    async fn log_and_filter_by_type() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let kind = unique("EditCategory");
        log_activity(&db, None, &kind, Some("Category"), Some(3), "renamed").await?;
        log_activity(&db, None, "Other", None, None, "x").await?;
        let page = list_activity(&db, Some(&kind), &GridCommand::default()).await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].entity_id, Some(3));

        let mut old: activity_log::ActiveModel = page.rows[0].clone().into();
        old.created_on_utc = Set((Utc::now() - Duration::days(40)).into());
        old.update(&db).await?;
        assert!(delete_older_than(&db, 30).await? >= 1);
        assert_eq!(list_activity(&db, Some(&kind), &GridCommand::default()).await?.total, 0);
        Ok(())
    }
}
