//! Create `currency`, `store`, `language` and `country` tables.
//!
//! Stores reference their primary currency, so currencies come first.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Currency::Table)
                    .if_not_exists()
                    .col(pk_auto(Currency::Id))
                    .col(string_len(Currency::Name, 50))
                    .col(string_len(Currency::CurrencyCode, 5))
                    .col(double(Currency::Rate))
                    .col(string_len_null(Currency::DisplayLocale, 50))
                    .col(string_len_null(Currency::CustomFormatting, 50))
                    .col(boolean(Currency::Published))
                    .col(integer(Currency::DisplayOrder))
                    .col(boolean(Currency::LimitedToStores))
                    .col(timestamp_with_time_zone(Currency::CreatedOnUtc))
                    .col(timestamp_with_time_zone(Currency::UpdatedOnUtc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Store::Table)
                    .if_not_exists()
                    .col(pk_auto(Store::Id))
                    .col(string_len(Store::Name, 400))
                    .col(string_len(Store::Url, 400))
                    .col(boolean(Store::SslEnabled))
                    .col(integer(Store::DisplayOrder))
                    .col(integer_null(Store::PrimaryCurrencyId))
                    .col(timestamp_with_time_zone(Store::CreatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_store_primary_currency")
                            .from(Store::Table, Store::PrimaryCurrencyId)
                            .to(Currency::Table, Currency::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Language::Table)
                    .if_not_exists()
                    .col(pk_auto(Language::Id))
                    .col(string_len(Language::Name, 100))
                    .col(string_len(Language::Culture, 20))
                    .col(boolean(Language::Published))
                    .col(integer(Language::DisplayOrder))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Country::Table)
                    .if_not_exists()
                    .col(pk_auto(Country::Id))
                    .col(string_len(Country::Name, 100))
                    .col(boolean(Country::AllowsBilling))
                    .col(boolean(Country::AllowsShipping))
                    .col(string_len(Country::TwoLetterIsoCode, 2))
                    .col(string_len(Country::ThreeLetterIsoCode, 3))
                    .col(integer(Country::NumericIsoCode))
                    .col(boolean(Country::SubjectToVat))
                    .col(boolean(Country::Published))
                    .col(integer(Country::DisplayOrder))
                    .col(boolean(Country::LimitedToStores))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Country::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Language::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Store::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Currency::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Currency {
    Table,
    Id,
    Name,
    CurrencyCode,
    Rate,
    DisplayLocale,
    CustomFormatting,
    Published,
    DisplayOrder,
    LimitedToStores,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum Store { Table, Id, Name, Url, SslEnabled, DisplayOrder, PrimaryCurrencyId, CreatedOnUtc }

#[derive(DeriveIden)]
enum Language { Table, Id, Name, Culture, Published, DisplayOrder }

#[derive(DeriveIden)]
enum Country {
    Table,
    Id,
    Name,
    AllowsBilling,
    AllowsShipping,
    TwoLetterIsoCode,
    ThreeLetterIsoCode,
    NumericIsoCode,
    SubjectToVat,
    Published,
    DisplayOrder,
    LimitedToStores,
}
