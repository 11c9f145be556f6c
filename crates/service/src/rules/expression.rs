//! Compiles persisted rule sets into evaluable expression trees.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::warn;

use models::rule;
use models::rule_set::{self, LogicalOperator, RuleScope};

use super::descriptor::{find_descriptor, ValueType};
use super::facts::{FactValue, Facts};
use super::operator::RuleOperator;
use crate::errors::ServiceError;

/// Deepest allowed nesting of sub groups below a root set.
pub const MAX_DEPTH: usize = 8;

/// Parsed rule value.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<FixedOffset>),
    IntList(Vec<i64>),
    StrList(Vec<String>),
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset())
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty())
}

/// Parses a stored value for the descriptor type and operator. `None` on failure.
pub fn parse_operand(value_type: ValueType, op: RuleOperator, raw: Option<&str>) -> Option<Operand> {
    if op.is_unary() {
        return Some(Operand::None);
    }
    let raw = raw.unwrap_or("").trim();
    let list = op.takes_list() || matches!(value_type, ValueType::IntArray | ValueType::StringArray);
    match value_type {
        ValueType::Boolean => parse_bool(raw).map(Operand::Bool),
        ValueType::Int | ValueType::IntArray if list => split_list(raw)
            .map(|p| p.parse::<i64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(Operand::IntList),
        ValueType::Int | ValueType::IntArray => raw.parse().ok().map(Operand::Int),
        ValueType::Float => raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(Operand::Float),
        ValueType::DateTime => parse_datetime(raw).map(Operand::DateTime),
        ValueType::String | ValueType::StringArray if list => {
            Some(Operand::StrList(split_list(raw).map(str::to_string).collect()))
        }
        ValueType::String | ValueType::StringArray => Some(Operand::Str(raw.to_string())),
    }
}

fn ordered(op: RuleOperator, ord: Ordering) -> bool {
    match op {
        RuleOperator::Equal => ord == Ordering::Equal,
        RuleOperator::NotEqual => ord != Ordering::Equal,
        RuleOperator::GreaterThan => ord == Ordering::Greater,
        RuleOperator::GreaterThanOrEqual => ord != Ordering::Less,
        RuleOperator::LessThan => ord == Ordering::Less,
        RuleOperator::LessThanOrEqual => ord != Ordering::Greater,
        _ => false,
    }
}

fn number(v: &FactValue) -> Option<f64> {
    match v {
        FactValue::Int(i) => Some(*i as f64),
        FactValue::Float(f) => Some(*f),
        _ => None,
    }
}

fn operand_number(v: &Operand) -> Option<f64> {
    match v {
        Operand::Int(i) => Some(*i as f64),
        Operand::Float(f) => Some(*f),
        _ => None,
    }
}

fn is_empty(v: &FactValue) -> bool {
    match v {
        FactValue::Null => true,
        FactValue::Str(s) => s.trim().is_empty(),
        FactValue::IntList(l) => l.is_empty(),
        FactValue::StrList(l) => l.is_empty(),
        _ => false,
    }
}

fn is_negation(op: RuleOperator) -> bool {
    matches!(op, RuleOperator::NotEqual | RuleOperator::NotIn | RuleOperator::NotContains)
}

fn list_op<T, F>(op: RuleOperator, fact: &[T], wanted: &[T], eq: F) -> bool
where
    F: Fn(&T, &T) -> bool,
{
    let contains = |hay: &[T], needle: &T| hay.iter().any(|h| eq(h, needle));
    match op {
        RuleOperator::In => fact.iter().any(|f| contains(wanted, f)),
        RuleOperator::NotIn => !fact.iter().any(|f| contains(wanted, f)),
        RuleOperator::AllIn => wanted.iter().all(|w| contains(fact, w)),
        RuleOperator::NotAllIn => !wanted.iter().all(|w| contains(fact, w)),
        _ => false,
    }
}

fn eq_ci(a: &String, b: &String) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Applies one operator. A `Null` fact satisfies only the negated operators.
pub fn apply(op: RuleOperator, fact: &FactValue, operand: &Operand) -> bool {
    match op {
        RuleOperator::IsNull => return matches!(fact, FactValue::Null),
        RuleOperator::IsNotNull => return !matches!(fact, FactValue::Null),
        RuleOperator::IsEmpty => return is_empty(fact),
        RuleOperator::IsNotEmpty => return !is_empty(fact),
        _ => {}
    }
    if matches!(fact, FactValue::Null) {
        return is_negation(op);
    }
    match (fact, operand) {
        (FactValue::Bool(a), Operand::Bool(b)) => match op {
            RuleOperator::Equal => a == b,
            RuleOperator::NotEqual => a != b,
            _ => false,
        },
        (FactValue::Int(a), Operand::Int(b)) => ordered(op, a.cmp(b)),
        (FactValue::Int(_) | FactValue::Float(_), Operand::Int(_) | Operand::Float(_)) => {
            match (number(fact), operand_number(operand)) {
                (Some(a), Some(b)) => a.partial_cmp(&b).is_some_and(|ord| ordered(op, ord)),
                _ => false,
            }
        }
        (FactValue::Int(a), Operand::IntList(list)) => list_op(op, &[*a], list, |x, y| x == y),
        (FactValue::DateTime(a), Operand::DateTime(b)) => ordered(op, a.cmp(b)),
        (FactValue::Str(s), Operand::Str(v)) => {
            let (s, v) = (s.to_lowercase(), v.to_lowercase());
            match op {
                RuleOperator::Equal => s == v,
                RuleOperator::NotEqual => s != v,
                RuleOperator::Contains => s.contains(&v),
                RuleOperator::NotContains => !s.contains(&v),
                RuleOperator::StartsWith => s.starts_with(&v),
                RuleOperator::EndsWith => s.ends_with(&v),
                _ => false,
            }
        }
        (FactValue::Str(s), Operand::StrList(list)) => list_op(op, std::slice::from_ref(s), list, eq_ci),
        (FactValue::IntList(f), Operand::IntList(w)) => list_op(op, f, w, |x, y| x == y),
        (FactValue::StrList(f), Operand::StrList(w)) => list_op(op, f, w, eq_ci),
        _ => false,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleExpression {
    pub rule_id: i32,
    pub descriptor: String,
    pub value_type: ValueType,
    pub operator: RuleOperator,
    pub raw_value: Option<String>,
    /// `None` when the stored value did not parse; such a rule never matches.
    pub operand: Option<Operand>,
}

impl RuleExpression {
    pub fn evaluate(&self, facts: &dyn Facts) -> bool {
        match &self.operand {
            Some(operand) => apply(self.operator, &facts.fact(&self.descriptor), operand),
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Rule(RuleExpression),
    Group(RuleExpressionGroup),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleExpressionGroup {
    pub rule_set_id: i32,
    pub scope: RuleScope,
    pub is_active: bool,
    pub logical_operator: LogicalOperator,
    pub expressions: Vec<Expression>,
}

impl RuleExpressionGroup {
    pub fn evaluate(&self, facts: &dyn Facts) -> bool {
        if !self.is_active {
            return false;
        }
        let mut results = self.expressions.iter().map(|e| match e {
            Expression::Rule(r) => r.evaluate(facts),
            Expression::Group(g) => g.evaluate(facts),
        });
        match self.logical_operator {
            LogicalOperator::And => results.all(|r| r),
            LogicalOperator::Or => self.expressions.is_empty() || results.any(|r| r),
        }
    }

    /// Number of leaf rules in the tree.
    pub fn rule_count(&self) -> usize {
        self.expressions
            .iter()
            .map(|e| match e {
                Expression::Rule(_) => 1,
                Expression::Group(g) => g.rule_count(),
            })
            .sum()
    }
}

/// A rule set row with its rules.
#[derive(Clone, Debug)]
pub struct LoadedSet {
    pub set: rule_set::Model,
    pub rules: Vec<rule::Model>,
}

/// Builds the tree rooted at `root` from preloaded sets.
pub fn compile(root: i32, sets: &HashMap<i32, LoadedSet>) -> Result<RuleExpressionGroup, ServiceError> {
    compile_inner(root, sets, &mut Vec::new())
}

fn compile_inner(id: i32, sets: &HashMap<i32, LoadedSet>, path: &mut Vec<i32>) -> Result<RuleExpressionGroup, ServiceError> {
    if path.contains(&id) {
        return Err(ServiceError::validation(format!("rule set {id} is referenced by its own sub group")));
    }
    if path.len() > MAX_DEPTH {
        return Err(ServiceError::validation(format!("rule groups are nested deeper than {MAX_DEPTH} levels")));
    }
    let loaded = sets.get(&id).ok_or_else(|| ServiceError::not_found("rule set"))?;
    let scope = loaded.set.scope;
    path.push(id);

    let mut rules: Vec<&rule::Model> = loaded.rules.iter().collect();
    rules.sort_by_key(|r| (r.display_order, r.id));
    let mut expressions = Vec::with_capacity(rules.len());
    for r in rules {
        if r.is_group() {
            let Some(child) = r.group_target().filter(|c| sets.contains_key(c)) else {
                warn!(rule_id = r.id, value = ?r.value, "group rule points at a missing rule set, skipped");
                continue;
            };
            if sets[&child].set.scope != scope {
                return Err(ServiceError::validation(format!("sub group {child} has a different scope")));
            }
            expressions.push(Expression::Group(compile_inner(child, sets, path)?));
            continue;
        }
        let Some(descriptor) = find_descriptor(scope, &r.rule_type) else {
            warn!(rule_id = r.id, rule_type = %r.rule_type, ?scope, "unknown rule descriptor, skipped");
            continue;
        };
        let operator = match r.operator.parse::<RuleOperator>() {
            Ok(op) if descriptor.value_type.allows(op) => op,
            _ => {
                warn!(rule_id = r.id, operator = %r.operator, "operator not allowed for descriptor, skipped");
                continue;
            }
        };
        expressions.push(Expression::Rule(RuleExpression {
            rule_id: r.id,
            operand: parse_operand(descriptor.value_type, operator, r.value.as_deref()),
            descriptor: descriptor.name,
            value_type: descriptor.value_type,
            operator,
            raw_value: r.value.clone(),
        }));
    }

    path.pop();
    Ok(RuleExpressionGroup {
        rule_set_id: id,
        scope,
        is_active: loaded.set.is_active,
        logical_operator: loaded.set.logical_operator,
        expressions,
    })
}

/// Loads the root set and every set reachable through group rules.
pub async fn load_sets<C: ConnectionTrait>(db: &C, root: i32) -> Result<HashMap<i32, LoadedSet>, ServiceError> {
    let mut out = HashMap::new();
    let mut queue = vec![root];
    while let Some(id) = queue.pop() {
        if out.contains_key(&id) {
            continue;
        }
        let Some(set) = rule_set::Entity::find_by_id(id).one(db).await? else {
            if id == root {
                return Err(ServiceError::not_found("rule set"));
            }
            continue;
        };
        let rules = rule::Entity::find()
            .filter(rule::Column::RuleSetId.eq(id))
            .order_by_asc(rule::Column::DisplayOrder)
            .order_by_asc(rule::Column::Id)
            .all(db)
            .await?;
        queue.extend(rules.iter().filter_map(|r| r.group_target()));
        out.insert(id, LoadedSet { set, rules });
    }
    Ok(out)
}

pub async fn build_expression<C: ConnectionTrait>(db: &C, rule_set_id: i32) -> Result<RuleExpressionGroup, ServiceError> {
    let sets = load_sets(db, rule_set_id).await?;
    compile(rule_set_id, &sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::facts::{CartFacts, CustomerFacts, ProductFacts};
    use chrono::Utc;
    use models::rule::GROUP_RULE_TYPE;

    fn set(id: i32, scope: RuleScope, op: LogicalOperator) -> rule_set::Model {
        let now = Utc::now().into();
        rule_set::Model {
            id,
            name: Some(format!("set {id}")),
            description: None,
            scope,
            is_active: true,
            is_sub_group: id != 1,
            logical_operator: op,
            created_on_utc: now,
            updated_on_utc: now,
        }
    }

    fn r(id: i32, set_id: i32, rule_type: &str, operator: &str, value: &str) -> rule::Model {
        rule::Model {
            id,
            rule_set_id: set_id,
            rule_type: rule_type.into(),
            operator: operator.into(),
            value: Some(value.into()),
            display_order: id,
        }
    }

    fn group(id: i32, set_id: i32, child: i32) -> rule::Model {
        r(id, set_id, GROUP_RULE_TYPE, "=", &child.to_string())
    }

    fn sets(list: Vec<(rule_set::Model, Vec<rule::Model>)>) -> HashMap<i32, LoadedSet> {
        list.into_iter().map(|(set, rules)| (set.id, LoadedSet { set, rules })).collect()
    }

    fn product() -> ProductFacts {
        ProductFacts {
            id: 7,
            category_ids: vec![1, 2],
            manufacturer_id: None,
            price: 19.99,
            published: true,
            stock_quantity: 5,
            sku: Some("TS-RED".into()),
            name: "Red Shirt".into(),
        }
    }

    fn leaf(descriptor: &str, value_type: ValueType, operator: RuleOperator, value: &str) -> Expression {
        Expression::Rule(RuleExpression {
            rule_id: 0,
            descriptor: descriptor.into(),
            value_type,
            operator,
            raw_value: Some(value.into()),
            operand: parse_operand(value_type, operator, Some(value)),
        })
    }

    fn grp(op: LogicalOperator, expressions: Vec<Expression>) -> RuleExpressionGroup {
        RuleExpressionGroup { rule_set_id: 1, scope: RuleScope::Product, is_active: true, logical_operator: op, expressions }
    }

    #[test]
    fn and_or_truth_tables() {
        let t = || leaf("Published", ValueType::Boolean, RuleOperator::Equal, "true");
        let f = || leaf("Published", ValueType::Boolean, RuleOperator::Equal, "false");
        let p = product();
        for (a, b, and, or) in [(true, true, true, true), (true, false, false, true), (false, true, false, true), (false, false, false, false)] {
            let pick = |v: bool| if v { t() } else { f() };
            assert_eq!(grp(LogicalOperator::And, vec![pick(a), pick(b)]).evaluate(&p), and);
            assert_eq!(grp(LogicalOperator::Or, vec![pick(a), pick(b)]).evaluate(&p), or);
        }
    }

    #[test]
    fn empty_group_matches_and_inactive_never() {
        let p = product();
        assert!(grp(LogicalOperator::And, vec![]).evaluate(&p));
        assert!(grp(LogicalOperator::Or, vec![]).evaluate(&p));
        let mut inactive = grp(LogicalOperator::And, vec![]);
        inactive.is_active = false;
        assert!(!inactive.evaluate(&p));
        let nested = grp(LogicalOperator::Or, vec![Expression::Group(inactive)]);
        assert!(!nested.evaluate(&p));
    }

    #[test]
    fn operator_semantics_per_type() {
        use RuleOperator::*;
        let p = product();
        let check = |d: &str, vt: ValueType, op: RuleOperator, v: &str| grp(LogicalOperator::And, vec![leaf(d, vt, op, v)]).evaluate(&p);

        assert!(check("Price", ValueType::Float, GreaterThan, "10"));
        assert!(check("Price", ValueType::Float, LessThanOrEqual, "19.99"));
        assert!(!check("Price", ValueType::Float, Equal, "20"));
        assert!(check("StockQuantity", ValueType::Int, In, "1, 5,9"));
        assert!(check("StockQuantity", ValueType::Int, NotIn, "1,2"));
        assert!(check("StockQuantity", ValueType::Int, GreaterThanOrEqual, "5"));

        assert!(check("Name", ValueType::String, Contains, "SHIRT"));
        assert!(check("Name", ValueType::String, StartsWith, "red"));
        assert!(!check("Name", ValueType::String, EndsWith, "red"));
        assert!(check("Sku", ValueType::String, In, "ts-blue, ts-red"));
        assert!(check("Name", ValueType::String, IsNotEmpty, ""));

        assert!(check("Category", ValueType::IntArray, In, "2,3"));
        assert!(check("Category", ValueType::IntArray, NotIn, "3,4"));
        assert!(check("Category", ValueType::IntArray, AllIn, "1,2"));
        assert!(check("Category", ValueType::IntArray, NotAllIn, "1,3"));

        assert!(check("Manufacturer", ValueType::Int, IsNull, ""));
        assert!(!check("Manufacturer", ValueType::Int, Equal, "1"));
        assert!(check("Manufacturer", ValueType::Int, NotEqual, "1"));
    }

    #[test]
    fn null_fact_matches_only_plain_negations() {
        use RuleOperator::*;
        let ids = Operand::IntList(vec![1, 2]);
        assert!(apply(NotIn, &FactValue::Null, &ids));
        assert!(apply(NotEqual, &FactValue::Null, &Operand::Int(1)));
        assert!(!apply(NotAllIn, &FactValue::Null, &ids));
        assert!(!apply(AllIn, &FactValue::Null, &ids));
        assert!(!apply(Equal, &FactValue::Null, &Operand::Int(1)));
    }

    #[test]
    fn unparsable_value_never_matches() {
        let p = product();
        let bad = leaf("Price", ValueType::Float, RuleOperator::NotEqual, "cheap");
        assert!(!grp(LogicalOperator::And, vec![bad.clone()]).evaluate(&p));
        assert!(!grp(LogicalOperator::Or, vec![bad]).evaluate(&p));
        assert_eq!(parse_operand(ValueType::IntArray, RuleOperator::In, Some("1,x")), None);
        assert!(parse_operand(ValueType::DateTime, RuleOperator::LessThan, Some("2024-05-01")).is_some());
    }

    #[test]
    fn compiles_nested_groups_and_skips_unknown_rules() {
        let loaded = sets(vec![
            (set(1, RuleScope::Cart, LogicalOperator::And), vec![
                r(1, 1, "CartTotal", ">=", "100"),
                r(2, 1, "ShoeSize", "=", "42"),
                r(3, 1, "CartTotal", "Contains", "1"),
                group(4, 1, 2),
            ]),
            (set(2, RuleScope::Cart, LogicalOperator::Or), vec![
                r(5, 2, "CouponCode", "=", "VIP"),
                r(6, 2, "CustomerRole", "In", "3"),
            ]),
        ]);
        let expr = compile(1, &loaded).unwrap();
        assert_eq!(expr.expressions.len(), 2);
        assert_eq!(expr.rule_count(), 3);

        let mut cart = CartFacts { total: 150.0, coupon_code: Some("vip".into()), ..Default::default() };
        assert!(expr.evaluate(&cart));
        cart.coupon_code = None;
        assert!(!expr.evaluate(&cart));
        cart.customer = CustomerFacts { role_ids: vec![3], ..Default::default() };
        assert!(expr.evaluate(&cart));
        cart.total = 99.0;
        assert!(!expr.evaluate(&cart));
    }

    #[test]
    fn cycles_and_depth_are_rejected() {
        let cyclic = sets(vec![
            (set(1, RuleScope::Customer, LogicalOperator::And), vec![group(1, 1, 2)]),
            (set(2, RuleScope::Customer, LogicalOperator::And), vec![group(2, 2, 1)]),
        ]);
        assert!(matches!(compile(1, &cyclic), Err(ServiceError::Validation(_))));

        let chain = |len: i32| {
            sets((1..=len)
                .map(|i| {
                    let rules = if i < len { vec![group(i, i, i + 1)] } else { vec![] };
                    (set(i, RuleScope::Customer, LogicalOperator::And), rules)
                })
                .collect())
        };
        assert!(compile(1, &chain(9)).is_ok());
        assert!(compile(1, &chain(10)).is_err());

        let mixed = sets(vec![
            (set(1, RuleScope::Customer, LogicalOperator::And), vec![group(1, 1, 2)]),
            (set(2, RuleScope::Product, LogicalOperator::And), vec![]),
        ]);
        assert!(compile(1, &mixed).is_err());
    }
}
