use crate::db::{connect_with_config, DatabaseConfig};
use crate::{admin_user, rule, rule_set};
use anyhow::Result;
use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, Set};

async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = connect_with_config(&DatabaseConfig::in_memory()).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::test]
async fn admin_user_create_lowercases_email() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let u = admin_user::create(&db, "Ops@Example.COM", "Ops", "hash".into(), "argon2").await?;
    assert_eq!(u.email, "ops@example.com");
    assert!(admin_user::Entity::find_by_id(u.id).one(&db).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn rule_set_enums_round_trip_through_storage() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let now = Utc::now().fixed_offset();
    let set = rule_set::ActiveModel {
        name: Set(Some("VIP".into())),
        scope: Set(rule_set::RuleScope::Customer),
        is_active: Set(true),
        is_sub_group: Set(false),
        logical_operator: Set(rule_set::LogicalOperator::Or),
        created_on_utc: Set(now),
        updated_on_utc: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    rule::ActiveModel {
        rule_set_id: Set(set.id),
        rule_type: Set(rule::GROUP_RULE_TYPE.into()),
        operator: Set("=".into()),
        value: Set(Some(" 42 ".into())),
        display_order: Set(0),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    let loaded = rule_set::Entity::find_by_id(set.id).one(&db).await?.expect("rule set");
    assert_eq!(loaded.scope, rule_set::RuleScope::Customer);
    assert_eq!(loaded.logical_operator, rule_set::LogicalOperator::Or);

    let rules = loaded.find_related(rule::Entity).all(&db).await?;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].group_target(), Some(42));
    Ok(())
}
