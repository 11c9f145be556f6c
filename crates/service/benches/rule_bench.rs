use std::collections::HashMap;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use models::rule::{self, GROUP_RULE_TYPE};
use models::rule_set::{self, LogicalOperator, RuleScope};
use service::rules::expression::{compile, LoadedSet};
use service::rules::facts::{CartFacts, CustomerFacts};

fn set(id: i32, op: LogicalOperator, sub: bool) -> rule_set::Model {
    rule_set::Model {
        id,
        name: Some(format!("set {id}")),
        description: None,
        scope: RuleScope::Cart,
        is_active: true,
        is_sub_group: sub,
        logical_operator: op,
        created_on_utc: Utc::now().into(),
        updated_on_utc: Utc::now().into(),
    }
}

fn rule(id: i32, set_id: i32, rule_type: &str, operator: &str, value: &str) -> rule::Model {
    rule::Model { id, rule_set_id: set_id, rule_type: rule_type.into(), operator: operator.into(), value: Some(value.into()), display_order: id }
}

fn bench_cart_rules(c: &mut Criterion) {
    let mut sets = HashMap::new();
    sets.insert(1, LoadedSet {
        set: set(1, LogicalOperator::And, false),
        rules: vec![
            rule(1, 1, "CartTotal", ">=", "50"),
            rule(2, 1, "CustomerRole", "In", "1,2,3"),
            rule(3, 1, GROUP_RULE_TYPE, "=", "2"),
        ],
    });
    sets.insert(2, LoadedSet {
        set: set(2, LogicalOperator::Or, true),
        rules: vec![
            rule(4, 2, "CouponCode", "=", "SPRING"),
            rule(5, 2, "CartProductIds", "In", "10,11,12"),
            rule(6, 2, "Email", "EndsWith", "@shop.test"),
        ],
    });
    let expr = compile(1, &sets).expect("compile");

    let carts: Vec<CartFacts> = (0..64)
        .map(|i| CartFacts {
            customer: CustomerFacts { role_ids: vec![i % 4], email: Some(format!("c{i}@shop.test")), ..Default::default() },
            total: f64::from(i) * 2.5,
            item_count: i64::from(i % 7),
            product_ids: vec![i, i + 10],
            coupon_code: (i % 5 == 0).then(|| "spring".to_string()),
        })
        .collect();

    c.bench_function("rules_compile", |b| b.iter(|| compile(black_box(1), black_box(&sets)).expect("compile")));
    c.bench_function("rules_evaluate_cart", |b| {
        b.iter(|| carts.iter().filter(|cart| expr.evaluate(black_box(*cart))).count())
    });
}

criterion_group!(benches, bench_cart_rules);
criterion_main!(benches);
