//! Create menu, menu item, topic, message template and theme variable tables.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Menu::Table)
                    .if_not_exists()
                    .col(pk_auto(Menu::Id))
                    .col(string_len(Menu::SystemName, 400))
                    .col(string_len_null(Menu::Title, 400))
                    .col(string_len_null(Menu::Template, 400))
                    .col(boolean(Menu::Published))
                    .col(boolean(Menu::IsSystem))
                    .col(boolean(Menu::LimitedToStores))
                    .col(boolean(Menu::SubjectToAcl))
                    .col(timestamp_with_time_zone(Menu::CreatedOnUtc))
                    .col(timestamp_with_time_zone(Menu::UpdatedOnUtc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MenuItem::Table)
                    .if_not_exists()
                    .col(pk_auto(MenuItem::Id))
                    .col(integer(MenuItem::MenuId))
                    .col(integer_null(MenuItem::ParentItemId))
                    .col(string_len_null(MenuItem::ProviderName, 100))
                    .col(text_null(MenuItem::Model))
                    .col(string_len_null(MenuItem::Title, 400))
                    .col(integer(MenuItem::DisplayOrder))
                    .col(boolean(MenuItem::Published))
                    .col(string_len_null(MenuItem::CssClass, 100))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_menu_item_menu")
                            .from(MenuItem::Table, MenuItem::MenuId)
                            .to(Menu::Table, Menu::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Topic::Table)
                    .if_not_exists()
                    .col(pk_auto(Topic::Id))
                    .col(string_len(Topic::SystemName, 400))
                    .col(string_len_null(Topic::Title, 400))
                    .col(text_null(Topic::Body))
                    .col(boolean(Topic::IncludeInSitemap))
                    .col(boolean(Topic::IsPasswordProtected))
                    .col(string_len_null(Topic::Password, 200))
                    .col(boolean(Topic::IsPublished))
                    .col(boolean(Topic::IsSystem))
                    .col(boolean(Topic::LimitedToStores))
                    .col(boolean(Topic::SubjectToAcl))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MessageTemplate::Table)
                    .if_not_exists()
                    .col(pk_auto(MessageTemplate::Id))
                    .col(string_len(MessageTemplate::Name, 200))
                    .col(string_len(MessageTemplate::ToAddress, 500))
                    .col(string_len_null(MessageTemplate::ReplyTo, 500))
                    .col(string_len(MessageTemplate::Subject, 1000))
                    .col(text(MessageTemplate::Body))
                    .col(boolean(MessageTemplate::IsActive))
                    .col(integer_null(MessageTemplate::EmailAccountId))
                    .col(boolean(MessageTemplate::LimitedToStores))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ThemeVariable::Table)
                    .if_not_exists()
                    .col(pk_auto(ThemeVariable::Id))
                    .col(string_len(ThemeVariable::Theme, 400))
                    .col(integer(ThemeVariable::StoreId))
                    .col(string_len(ThemeVariable::Name, 400))
                    .col(text(ThemeVariable::Value))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_theme_variable_store")
                            .from(ThemeVariable::Table, ThemeVariable::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ThemeVariable::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MessageTemplate::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Topic::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MenuItem::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Menu::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Menu {
    Table,
    Id,
    SystemName,
    Title,
    Template,
    Published,
    IsSystem,
    LimitedToStores,
    SubjectToAcl,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum MenuItem {
    Table,
    Id,
    MenuId,
    ParentItemId,
    ProviderName,
    Model,
    Title,
    DisplayOrder,
    Published,
    CssClass,
}

#[derive(DeriveIden)]
enum Topic {
    Table,
    Id,
    SystemName,
    Title,
    Body,
    IncludeInSitemap,
    IsPasswordProtected,
    Password,
    IsPublished,
    IsSystem,
    LimitedToStores,
    SubjectToAcl,
}

#[derive(DeriveIden)]
enum MessageTemplate {
    Table,
    Id,
    Name,
    ToAddress,
    ReplyTo,
    Subject,
    Body,
    IsActive,
    EmailAccountId,
    LimitedToStores,
}

#[derive(DeriveIden)]
enum ThemeVariable { Table, Id, Theme, StoreId, Name, Value }

#[derive(DeriveIden)]
enum Store { Table, Id }
