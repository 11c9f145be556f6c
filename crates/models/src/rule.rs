use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `rule_type` of a rule that nests another rule set.
pub const GROUP_RULE_TYPE: &str = "Group";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rule")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub rule_set_id: i32,
    pub rule_type: String,
    pub operator: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub value: Option<String>,
    pub display_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rule_set::Entity",
        from = "Column::RuleSetId",
        to = "super::rule_set::Column::Id",
        on_delete = "Cascade"
    )]
    RuleSet,
}

impl Related<super::rule_set::Entity> for Entity {
    fn to() -> RelationDef { Relation::RuleSet.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_group(&self) -> bool { self.rule_type == GROUP_RULE_TYPE }

    /// Child rule set id of a `Group` rule.
    pub fn group_target(&self) -> Option<i32> {
        if !self.is_group() { return None; }
        self.value.as_deref().and_then(|v| v.trim().parse().ok())
    }
}
