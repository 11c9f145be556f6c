//! Create `schedule_task`, `import_profile` and `export_profile` tables.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScheduleTask::Table)
                    .if_not_exists()
                    .col(pk_auto(ScheduleTask::Id))
                    .col(string_len(ScheduleTask::Name, 500))
                    .col(string_len(ScheduleTask::TaskType, 800))
                    .col(boolean(ScheduleTask::Enabled))
                    .col(boolean(ScheduleTask::IsRunning))
                    .col(timestamp_with_time_zone_null(ScheduleTask::NextRunUtc))
                    .col(timestamp_with_time_zone_null(ScheduleTask::LastStartUtc))
                    .col(timestamp_with_time_zone_null(ScheduleTask::LastEndUtc))
                    .col(text_null(ScheduleTask::LastError))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ImportProfile::Table)
                    .if_not_exists()
                    .col(pk_auto(ImportProfile::Id))
                    .col(string_len(ImportProfile::Name, 100))
                    .col(string_len(ImportProfile::FolderName, 100))
                    .col(string_len(ImportProfile::FileType, 10))
                    .col(string_len(ImportProfile::EntityType, 40))
                    .col(boolean(ImportProfile::Enabled))
                    .col(integer(ImportProfile::Skip))
                    .col(integer(ImportProfile::Take))
                    .col(string_len_null(ImportProfile::KeyFieldNames, 1000))
                    .col(text_null(ImportProfile::ColumnMapping))
                    .col(text_null(ImportProfile::ResultInfo))
                    .col(integer(ImportProfile::ScheduleTaskId))
                    .col(timestamp_with_time_zone(ImportProfile::CreatedOnUtc))
                    .col(timestamp_with_time_zone(ImportProfile::UpdatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_import_profile_task")
                            .from(ImportProfile::Table, ImportProfile::ScheduleTaskId)
                            .to(ScheduleTask::Table, ScheduleTask::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExportProfile::Table)
                    .if_not_exists()
                    .col(pk_auto(ExportProfile::Id))
                    .col(string_len(ExportProfile::Name, 100))
                    .col(string_len(ExportProfile::FolderName, 100))
                    .col(string_len(ExportProfile::ProviderSystemName, 400))
                    .col(boolean(ExportProfile::Enabled))
                    .col(text_null(ExportProfile::Filtering))
                    .col(text_null(ExportProfile::Projection))
                    .col(string_len_null(ExportProfile::FileNamePattern, 500))
                    .col(text_null(ExportProfile::ResultInfo))
                    .col(integer(ExportProfile::ScheduleTaskId))
                    .col(timestamp_with_time_zone(ExportProfile::CreatedOnUtc))
                    .col(timestamp_with_time_zone(ExportProfile::UpdatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_export_profile_task")
                            .from(ExportProfile::Table, ExportProfile::ScheduleTaskId)
                            .to(ScheduleTask::Table, ScheduleTask::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ExportProfile::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ImportProfile::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ScheduleTask::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ScheduleTask {
    Table,
    Id,
    Name,
    TaskType,
    Enabled,
    IsRunning,
    NextRunUtc,
    LastStartUtc,
    LastEndUtc,
    LastError,
}

#[derive(DeriveIden)]
enum ImportProfile {
    Table,
    Id,
    Name,
    FolderName,
    FileType,
    EntityType,
    Enabled,
    Skip,
    Take,
    KeyFieldNames,
    ColumnMapping,
    ResultInfo,
    ScheduleTaskId,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum ExportProfile {
    Table,
    Id,
    Name,
    FolderName,
    ProviderSystemName,
    Enabled,
    Filtering,
    Projection,
    FileNamePattern,
    ResultInfo,
    ScheduleTaskId,
    CreatedOnUtc,
    UpdatedOnUtc,
}
