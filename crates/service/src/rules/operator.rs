use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Comparison operator of a rule, persisted by its token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleOperator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    AllIn,
    NotAllIn,
    IsEmpty,
    IsNotEmpty,
    IsNull,
    IsNotNull,
}

impl RuleOperator {
    pub const ALL: [RuleOperator; 18] = [
        RuleOperator::Equal,
        RuleOperator::NotEqual,
        RuleOperator::GreaterThan,
        RuleOperator::GreaterThanOrEqual,
        RuleOperator::LessThan,
        RuleOperator::LessThanOrEqual,
        RuleOperator::Contains,
        RuleOperator::NotContains,
        RuleOperator::StartsWith,
        RuleOperator::EndsWith,
        RuleOperator::In,
        RuleOperator::NotIn,
        RuleOperator::AllIn,
        RuleOperator::NotAllIn,
        RuleOperator::IsEmpty,
        RuleOperator::IsNotEmpty,
        RuleOperator::IsNull,
        RuleOperator::IsNotNull,
    ];

    pub fn token(self) -> &'static str {
        match self {
            RuleOperator::Equal => "=",
            RuleOperator::NotEqual => "!=",
            RuleOperator::GreaterThan => ">",
            RuleOperator::GreaterThanOrEqual => ">=",
            RuleOperator::LessThan => "<",
            RuleOperator::LessThanOrEqual => "<=",
            RuleOperator::Contains => "Contains",
            RuleOperator::NotContains => "NotContains",
            RuleOperator::StartsWith => "StartsWith",
            RuleOperator::EndsWith => "EndsWith",
            RuleOperator::In => "In",
            RuleOperator::NotIn => "NotIn",
            RuleOperator::AllIn => "AllIn",
            RuleOperator::NotAllIn => "NotAllIn",
            RuleOperator::IsEmpty => "IsEmpty",
            RuleOperator::IsNotEmpty => "IsNotEmpty",
            RuleOperator::IsNull => "IsNull",
            RuleOperator::IsNotNull => "IsNotNull",
        }
    }

    /// Unary operators ignore the rule value.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            RuleOperator::IsEmpty | RuleOperator::IsNotEmpty | RuleOperator::IsNull | RuleOperator::IsNotNull
        )
    }

    /// Operators whose operand is a list even on scalar descriptors.
    pub fn takes_list(self) -> bool {
        matches!(self, RuleOperator::In | RuleOperator::NotIn | RuleOperator::AllIn | RuleOperator::NotAllIn)
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for RuleOperator {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        RuleOperator::ALL
            .into_iter()
            .find(|op| op.token().eq_ignore_ascii_case(s))
            .ok_or_else(|| ServiceError::validation(format!("unknown rule operator: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_back() {
        for op in RuleOperator::ALL {
            assert_eq!(op.token().parse::<RuleOperator>().unwrap(), op);
        }
        assert_eq!("notin".parse::<RuleOperator>().unwrap(), RuleOperator::NotIn);
        assert!("~=".parse::<RuleOperator>().is_err());
    }

    #[test]
    fn serde_uses_tokens() {
        assert_eq!(serde_json::to_string(&RuleOperator::GreaterThanOrEqual).unwrap(), "\">=\"");
        let op: RuleOperator = serde_json::from_str("\"AllIn\"").unwrap();
        assert_eq!(op, RuleOperator::AllIn);
    }
}
