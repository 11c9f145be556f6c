//! Create `rule_set`, `rule`, `discount` and the discount ↔ rule set join table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RuleSet::Table)
                    .if_not_exists()
                    .col(pk_auto(RuleSet::Id))
                    .col(string_len_null(RuleSet::Name, 200))
                    .col(text_null(RuleSet::Description))
                    .col(string_len(RuleSet::Scope, 20))
                    .col(boolean(RuleSet::IsActive))
                    .col(boolean(RuleSet::IsSubGroup))
                    .col(string_len(RuleSet::LogicalOperator, 5))
                    .col(timestamp_with_time_zone(RuleSet::CreatedOnUtc))
                    .col(timestamp_with_time_zone(RuleSet::UpdatedOnUtc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rule::Table)
                    .if_not_exists()
                    .col(pk_auto(Rule::Id))
                    .col(integer(Rule::RuleSetId))
                    .col(string_len(Rule::RuleType, 100))
                    .col(string_len(Rule::Operator, 20))
                    .col(text_null(Rule::Value))
                    .col(integer(Rule::DisplayOrder))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rule_rule_set")
                            .from(Rule::Table, Rule::RuleSetId)
                            .to(RuleSet::Table, RuleSet::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Discount::Table)
                    .if_not_exists()
                    .col(pk_auto(Discount::Id))
                    .col(string_len(Discount::Name, 200))
                    .col(string_len(Discount::DiscountType, 40))
                    .col(boolean(Discount::UsePercentage))
                    .col(double(Discount::DiscountPercentage))
                    .col(double(Discount::DiscountAmount))
                    .col(timestamp_with_time_zone_null(Discount::StartsOnUtc))
                    .col(timestamp_with_time_zone_null(Discount::EndsOnUtc))
                    .col(boolean(Discount::RequiresCouponCode))
                    .col(string_len_null(Discount::CouponCode, 100))
                    .col(string_len(Discount::Limitation, 30))
                    .col(integer(Discount::LimitationTimes))
                    .col(timestamp_with_time_zone(Discount::CreatedOnUtc))
                    .col(timestamp_with_time_zone(Discount::UpdatedOnUtc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiscountRuleSet::Table)
                    .if_not_exists()
                    .col(pk_auto(DiscountRuleSet::Id))
                    .col(integer(DiscountRuleSet::DiscountId))
                    .col(integer(DiscountRuleSet::RuleSetId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_discount_rule_set_discount")
                            .from(DiscountRuleSet::Table, DiscountRuleSet::DiscountId)
                            .to(Discount::Table, Discount::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_discount_rule_set_rule_set")
                            .from(DiscountRuleSet::Table, DiscountRuleSet::RuleSetId)
                            .to(RuleSet::Table, RuleSet::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(DiscountRuleSet::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Discount::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Rule::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(RuleSet::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum RuleSet {
    Table,
    Id,
    Name,
    Description,
    Scope,
    IsActive,
    IsSubGroup,
    LogicalOperator,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum Rule { Table, Id, RuleSetId, RuleType, Operator, Value, DisplayOrder }

#[derive(DeriveIden)]
enum Discount {
    Table,
    Id,
    Name,
    DiscountType,
    UsePercentage,
    DiscountPercentage,
    DiscountAmount,
    StartsOnUtc,
    EndsOnUtc,
    RequiresCouponCode,
    CouponCode,
    Limitation,
    LimitationTimes,
    CreatedOnUtc,
    UpdatedOnUtc,
}

#[derive(DeriveIden)]
enum DiscountRuleSet { Table, Id, DiscountId, RuleSetId }
