//! Create customer, role, admin user and activity log tables.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomerRole::Table)
                    .if_not_exists()
                    .col(pk_auto(CustomerRole::Id))
                    .col(string_len(CustomerRole::Name, 255))
                    .col(string_len_null(CustomerRole::SystemName, 255))
                    .col(boolean(CustomerRole::Active))
                    .col(boolean(CustomerRole::IsSystemRole))
                    .col(boolean(CustomerRole::TaxExempt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Customer::Table)
                    .if_not_exists()
                    .col(pk_auto(Customer::Id))
                    .col(string_len(Customer::Email, 255))
                    .col(string_len_null(Customer::Username, 255))
                    .col(boolean(Customer::Active))
                    .col(boolean(Customer::Deleted))
                    .col(boolean(Customer::IsTaxExempt))
                    .col(integer_null(Customer::BillingCountryId))
                    .col(text_null(Customer::AdminComment))
                    .col(timestamp_with_time_zone(Customer::CreatedOnUtc))
                    .col(timestamp_with_time_zone(Customer::LastActivityUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_billing_country")
                            .from(Customer::Table, Customer::BillingCountryId)
                            .to(Country::Table, Country::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomerRoleMapping::Table)
                    .if_not_exists()
                    .col(pk_auto(CustomerRoleMapping::Id))
                    .col(integer(CustomerRoleMapping::CustomerId))
                    .col(integer(CustomerRoleMapping::CustomerRoleId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_mapping_customer")
                            .from(CustomerRoleMapping::Table, CustomerRoleMapping::CustomerId)
                            .to(Customer::Table, Customer::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_mapping_role")
                            .from(CustomerRoleMapping::Table, CustomerRoleMapping::CustomerRoleId)
                            .to(CustomerRole::Table, CustomerRole::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdminUser::Table)
                    .if_not_exists()
                    .col(pk_auto(AdminUser::Id))
                    .col(string_len(AdminUser::Email, 255).unique_key())
                    .col(string_len(AdminUser::Name, 128))
                    .col(string_len(AdminUser::PasswordHash, 255))
                    .col(string_len(AdminUser::PasswordAlgorithm, 32))
                    .col(boolean(AdminUser::Active))
                    .col(timestamp_with_time_zone(AdminUser::CreatedOnUtc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ActivityLog::Table)
                    .if_not_exists()
                    .col(pk_auto(ActivityLog::Id))
                    .col(string_len(ActivityLog::ActivityType, 100))
                    .col(integer_null(ActivityLog::AdminUserId))
                    .col(string_len_null(ActivityLog::EntityName, 100))
                    .col(integer_null(ActivityLog::EntityId))
                    .col(text(ActivityLog::Comment))
                    .col(timestamp_with_time_zone(ActivityLog::CreatedOnUtc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ActivityLog::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(AdminUser::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(CustomerRoleMapping::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Customer::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(CustomerRole::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CustomerRole { Table, Id, Name, SystemName, Active, IsSystemRole, TaxExempt }

#[derive(DeriveIden)]
enum Customer {
    Table,
    Id,
    Email,
    Username,
    Active,
    Deleted,
    IsTaxExempt,
    BillingCountryId,
    AdminComment,
    CreatedOnUtc,
    LastActivityUtc,
}

#[derive(DeriveIden)]
enum CustomerRoleMapping { Table, Id, CustomerId, CustomerRoleId }

#[derive(DeriveIden)]
enum AdminUser { Table, Id, Email, Name, PasswordHash, PasswordAlgorithm, Active, CreatedOnUtc }

#[derive(DeriveIden)]
enum ActivityLog { Table, Id, ActivityType, AdminUserId, EntityName, EntityId, Comment, CreatedOnUtc }

#[derive(DeriveIden)]
enum Country { Table, Id }
