//! Create specification and product attribute tables with their option children.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SpecificationAttribute::Table)
                    .if_not_exists()
                    .col(pk_auto(SpecificationAttribute::Id))
                    .col(string_len(SpecificationAttribute::Name, 400))
                    .col(string_len_null(SpecificationAttribute::Alias, 100))
                    .col(integer(SpecificationAttribute::DisplayOrder))
                    .col(boolean(SpecificationAttribute::AllowFiltering))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SpecificationAttributeOption::Table)
                    .if_not_exists()
                    .col(pk_auto(SpecificationAttributeOption::Id))
                    .col(integer(SpecificationAttributeOption::SpecificationAttributeId))
                    .col(string_len(SpecificationAttributeOption::Name, 400))
                    .col(string_len_null(SpecificationAttributeOption::Alias, 100))
                    .col(integer(SpecificationAttributeOption::DisplayOrder))
                    .col(string_len_null(SpecificationAttributeOption::ColorRgb, 10))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_spec_option_attribute")
                            .from(SpecificationAttributeOption::Table, SpecificationAttributeOption::SpecificationAttributeId)
                            .to(SpecificationAttribute::Table, SpecificationAttribute::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductAttribute::Table)
                    .if_not_exists()
                    .col(pk_auto(ProductAttribute::Id))
                    .col(string_len(ProductAttribute::Name, 400))
                    .col(string_len_null(ProductAttribute::Alias, 100))
                    .col(text_null(ProductAttribute::Description))
                    .col(boolean(ProductAttribute::AllowFiltering))
                    .col(integer(ProductAttribute::DisplayOrder))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductAttributeOption::Table)
                    .if_not_exists()
                    .col(pk_auto(ProductAttributeOption::Id))
                    .col(integer(ProductAttributeOption::ProductAttributeId))
                    .col(string_len(ProductAttributeOption::Name, 400))
                    .col(string_len_null(ProductAttributeOption::Alias, 100))
                    .col(double(ProductAttributeOption::PriceAdjustment))
                    .col(double(ProductAttributeOption::WeightAdjustment))
                    .col(boolean(ProductAttributeOption::IsPreselected))
                    .col(integer(ProductAttributeOption::DisplayOrder))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_option_attribute")
                            .from(ProductAttributeOption::Table, ProductAttributeOption::ProductAttributeId)
                            .to(ProductAttribute::Table, ProductAttribute::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ProductAttributeOption::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ProductAttribute::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(SpecificationAttributeOption::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(SpecificationAttribute::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SpecificationAttribute { Table, Id, Name, Alias, DisplayOrder, AllowFiltering }

#[derive(DeriveIden)]
enum SpecificationAttributeOption { Table, Id, SpecificationAttributeId, Name, Alias, DisplayOrder, ColorRgb }

#[derive(DeriveIden)]
enum ProductAttribute { Table, Id, Name, Alias, Description, AllowFiltering, DisplayOrder }

#[derive(DeriveIden)]
enum ProductAttributeOption {
    Table,
    Id,
    ProductAttributeId,
    Name,
    Alias,
    PriceAdjustment,
    WeightAdjustment,
    IsPreselected,
    DisplayOrder,
}
