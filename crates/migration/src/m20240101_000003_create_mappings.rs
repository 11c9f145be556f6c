//! Create the generic `localized_property`, `store_mapping` and `acl_record` tables.
//!
//! These tables key on (entity name, entity id) and carry no foreign key to the owning entity.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LocalizedProperty::Table)
                    .if_not_exists()
                    .col(pk_auto(LocalizedProperty::Id))
                    .col(integer(LocalizedProperty::EntityId))
                    .col(integer(LocalizedProperty::LanguageId))
                    .col(string_len(LocalizedProperty::LocaleKeyGroup, 150))
                    .col(string_len(LocalizedProperty::LocaleKey, 150))
                    .col(text(LocalizedProperty::LocaleValue))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_localized_property_language")
                            .from(LocalizedProperty::Table, LocalizedProperty::LanguageId)
                            .to(Language::Table, Language::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StoreMapping::Table)
                    .if_not_exists()
                    .col(pk_auto(StoreMapping::Id))
                    .col(integer(StoreMapping::EntityId))
                    .col(string_len(StoreMapping::EntityName, 100))
                    .col(integer(StoreMapping::StoreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_store_mapping_store")
                            .from(StoreMapping::Table, StoreMapping::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AclRecord::Table)
                    .if_not_exists()
                    .col(pk_auto(AclRecord::Id))
                    .col(integer(AclRecord::EntityId))
                    .col(string_len(AclRecord::EntityName, 100))
                    .col(integer(AclRecord::CustomerRoleId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_acl_record_role")
                            .from(AclRecord::Table, AclRecord::CustomerRoleId)
                            .to(CustomerRole::Table, CustomerRole::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AclRecord::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(StoreMapping::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LocalizedProperty::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum LocalizedProperty { Table, Id, EntityId, LanguageId, LocaleKeyGroup, LocaleKey, LocaleValue }

#[derive(DeriveIden)]
enum StoreMapping { Table, Id, EntityId, EntityName, StoreId }

#[derive(DeriveIden)]
enum AclRecord { Table, Id, EntityId, EntityName, CustomerRoleId }

#[derive(DeriveIden)]
enum Language { Table, Id }

#[derive(DeriveIden)]
enum Store { Table, Id }

#[derive(DeriveIden)]
enum CustomerRole { Table, Id }
