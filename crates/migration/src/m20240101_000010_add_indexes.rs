use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Category: siblings are always read by parent
        manager
            .create_index(
                Index::create()
                    .name("idx_category_parent")
                    .table(Category::Table)
                    .col(Category::ParentId)
                    .to_owned(),
            )
            .await?;

        // Localized values: lookup by (group, entity)
        manager
            .create_index(
                Index::create()
                    .name("idx_localized_property_entity")
                    .table(LocalizedProperty::Table)
                    .col(LocalizedProperty::LocaleKeyGroup)
                    .col(LocalizedProperty::EntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_store_mapping_entity")
                    .table(StoreMapping::Table)
                    .col(StoreMapping::EntityName)
                    .col(StoreMapping::EntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_acl_record_entity")
                    .table(AclRecord::Table)
                    .col(AclRecord::EntityName)
                    .col(AclRecord::EntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rule_rule_set")
                    .table(Rule::Table)
                    .col(Rule::RuleSetId)
                    .to_owned(),
            )
            .await?;

        // Unique business keys
        manager
            .create_index(
                Index::create()
                    .name("uniq_country_two_letter_iso")
                    .table(Country::Table)
                    .col(Country::TwoLetterIsoCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_currency_code")
                    .table(Currency::Table)
                    .col(Currency::CurrencyCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_menu_system_name")
                    .table(Menu::Table)
                    .col(Menu::SystemName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_topic_system_name")
                    .table(Topic::Table)
                    .col(Topic::SystemName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_theme_variable")
                    .table(ThemeVariable::Table)
                    .col(ThemeVariable::Theme)
                    .col(ThemeVariable::StoreId)
                    .col(ThemeVariable::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table) in [
            ("uniq_theme_variable", ThemeVariable::Table.into_iden()),
            ("uniq_topic_system_name", Topic::Table.into_iden()),
            ("uniq_menu_system_name", Menu::Table.into_iden()),
            ("uniq_currency_code", Currency::Table.into_iden()),
            ("uniq_country_two_letter_iso", Country::Table.into_iden()),
            ("idx_rule_rule_set", Rule::Table.into_iden()),
            ("idx_acl_record_entity", AclRecord::Table.into_iden()),
            ("idx_store_mapping_entity", StoreMapping::Table.into_iden()),
            ("idx_localized_property_entity", LocalizedProperty::Table.into_iden()),
            ("idx_category_parent", Category::Table.into_iden()),
        ] {
            manager
                .drop_index(Index::drop().name(name).table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Category { Table, ParentId }

#[derive(DeriveIden)]
enum LocalizedProperty { Table, LocaleKeyGroup, EntityId }

#[derive(DeriveIden)]
enum StoreMapping { Table, EntityName, EntityId }

#[derive(DeriveIden)]
enum AclRecord { Table, EntityName, EntityId }

#[derive(DeriveIden)]
enum Rule { Table, RuleSetId }

#[derive(DeriveIden)]
enum Country { Table, TwoLetterIsoCode }

#[derive(DeriveIden)]
enum Currency { Table, CurrencyCode }

#[derive(DeriveIden)]
enum Menu { Table, SystemName }

#[derive(DeriveIden)]
enum Topic { Table, SystemName }

#[derive(DeriveIden)]
enum ThemeVariable { Table, Theme, StoreId, Name }
