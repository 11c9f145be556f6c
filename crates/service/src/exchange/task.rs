//! Scheduled tasks backing import and export profiles.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set};
use tracing::info;

use models::schedule_task;

use crate::errors::ServiceError;

pub const IMPORT_TASK_TYPE: &str = "DataImportTask";
pub const EXPORT_TASK_TYPE: &str = "DataExportTask";

/// Starts a task. Implementations only enqueue; the run itself happens elsewhere.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn run_task(&self, db: &DatabaseConnection, task_id: i32) -> Result<schedule_task::Model, ServiceError>;
}

/// Marks the task due now so the external worker picks it up on its next poll.
#[derive(Clone, Copy, Debug, Default)]
pub struct DbTaskScheduler;

#[async_trait]
impl TaskScheduler for DbTaskScheduler {
    async fn run_task(&self, db: &DatabaseConnection, task_id: i32) -> Result<schedule_task::Model, ServiceError> {
        let task = TaskStore::get(db, task_id).await?;
        if task.is_running {
            return Err(ServiceError::conflict(format!("task {} is already running", task.name)));
        }
        let mut am: schedule_task::ActiveModel = task.into();
        am.next_run_utc = Set(Some(Utc::now().into()));
        let task = am.update(db).await?;
        info!(task_id, task_type = %task.task_type, "task enqueued");
        Ok(task)
    }
}

/// Create, read and delete of the task row a profile owns.
pub struct TaskStore;

impl TaskStore {
    pub async fn create<C: ConnectionTrait>(db: &C, name: &str, task_type: &str) -> Result<schedule_task::Model, ServiceError> {
        Ok(schedule_task::ActiveModel {
            name: Set(name.to_string()),
            task_type: Set(task_type.to_string()),
            enabled: Set(false),
            is_running: Set(false),
            next_run_utc: Set(None),
            last_start_utc: Set(None),
            last_end_utc: Set(None),
            last_error: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    pub async fn get<C: ConnectionTrait>(db: &C, id: i32) -> Result<schedule_task::Model, ServiceError> {
        schedule_task::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("schedule task"))
    }

    pub async fn rename<C: ConnectionTrait>(db: &C, id: i32, name: &str, enabled: bool) -> Result<schedule_task::Model, ServiceError> {
        let mut am: schedule_task::ActiveModel = Self::get(db, id).await?.into();
        am.name = Set(name.to_string());
        am.enabled = Set(enabled);
        Ok(am.update(db).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i32) -> Result<(), ServiceError> {
        schedule_task::Entity::delete_by_id(id).exec(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn run_marks_task_due() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let task = TaskStore::create(&db, "Import: products", IMPORT_TASK_TYPE).await?;
        assert!(!task.enabled && task.next_run_utc.is_none());

        let queued = DbTaskScheduler.run_task(&db, task.id).await?;
        assert!(queued.next_run_utc.is_some());

        let mut am: schedule_task::ActiveModel = queued.into();
        am.is_running = Set(true);
        am.update(&db).await?;
        assert!(matches!(DbTaskScheduler.run_task(&db, task.id).await, Err(ServiceError::Conflict(_))));

        TaskStore::delete(&db, task.id).await?;
        assert!(TaskStore::get(&db, task.id).await.is_err());
        Ok(())
    }
}
