//! Migrator registering table migrations in foreign-key dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_directory;
mod m20240101_000002_create_customer;
mod m20240101_000003_create_mappings;
mod m20240101_000004_create_catalog;
mod m20240101_000005_create_attributes;
mod m20240101_000006_create_rules;
mod m20240101_000007_create_cms;
mod m20240101_000008_create_sales;
mod m20240101_000009_create_exchange;
mod m20240101_000010_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_directory::Migration),
            Box::new(m20240101_000002_create_customer::Migration),
            Box::new(m20240101_000003_create_mappings::Migration),
            Box::new(m20240101_000004_create_catalog::Migration),
            Box::new(m20240101_000005_create_attributes::Migration),
            Box::new(m20240101_000006_create_rules::Migration),
            Box::new(m20240101_000007_create_cms::Migration),
            Box::new(m20240101_000008_create_sales::Migration),
            Box::new(m20240101_000009_create_exchange::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000010_add_indexes::Migration),
        ]
    }
}
