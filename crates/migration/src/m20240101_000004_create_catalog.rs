//! Create `category`, `manufacturer`, `product` and `product_category` tables.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(pk_auto(Category::Id))
                    .col(string_len(Category::Name, 400))
                    .col(text_null(Category::Description))
                    .col(integer_null(Category::ParentId))
                    .col(integer(Category::DisplayOrder))
                    .col(boolean(Category::Published))
                    .col(boolean(Category::Deleted))
                    .col(boolean(Category::SubjectToAcl))
                    .col(boolean(Category::LimitedToStores))
                    .col(timestamp_with_time_zone(Category::CreatedOnUtc))
                    .col(timestamp_with_time_zone(Category::UpdatedOnUtc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Manufacturer::Table)
                    .if_not_exists()
                    .col(pk_auto(Manufacturer::Id))
                    .col(string_len(Manufacturer::Name, 400))
                    .col(text_null(Manufacturer::Description))
                    .col(integer(Manufacturer::DisplayOrder))
                    .col(boolean(Manufacturer::Published))
                    .col(boolean(Manufacturer::Deleted))
                    .col(boolean(Manufacturer::LimitedToStores))
                    .col(timestamp_with_time_zone(Manufacturer::CreatedOnUtc))
                    .col(timestamp_with_time_zone(Manufacturer::UpdatedOnUtc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Product::Table)
                    .if_not_exists()
                    .col(pk_auto(Product::Id))
                    .col(string_len(Product::Name, 400))
                    .col(string_len_null(Product::Sku, 100))
                    .col(double(Product::Price))
                    .col(boolean(Product::Published))
                    .col(boolean(Product::Deleted))
                    .col(integer(Product::StockQuantity))
                    .col(integer_null(Product::ManufacturerId))
                    .col(timestamp_with_time_zone(Product::CreatedOnUtc))
                    .col(timestamp_with_time_zone(Product::UpdatedOnUtc))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_manufacturer")
                            .from(Product::Table, Product::ManufacturerId)
                            .to(Manufacturer::Table, Manufacturer::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductCategory::Table)
                    .if_not_exists()
                    .col(pk_auto(ProductCategory::Id))
                    .col(integer(ProductCategory::ProductId))
                    .col(integer(ProductCategory::CategoryId))
                    .col(integer(ProductCategory::DisplayOrder))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_category_product")
                            .from(ProductCategory::Table, ProductCategory::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_category_category")
                            .from(ProductCategory::Table, ProductCategory::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ProductCategory::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Product::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Manufacturer::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Category::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Category {
    Table,
    Id,
    Name,
    Description,
    ParentId,
    DisplayOrder,
    Published,
    Deleted,
    SubjectToAcl,
    LimitedToStores,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum Manufacturer {
    Table,
    Id,
    Name,
    Description,
    DisplayOrder,
    Published,
    Deleted,
    LimitedToStores,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum Product {
    Table,
    Id,
    Name,
    Sku,
    Price,
    Published,
    Deleted,
    StockQuantity,
    ManufacturerId,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum ProductCategory { Table, Id, ProductId, CategoryId, DisplayOrder }
