//! What each rule scope can filter on.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use common::types::SelectOption;
use models::rule_set::RuleScope;

use super::operator::RuleOperator;
use crate::errors::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Int,
    Float,
    String,
    DateTime,
    IntArray,
    StringArray,
}

impl ValueType {
    pub fn operators(self) -> &'static [RuleOperator] {
        use RuleOperator::*;
        match self {
            ValueType::Boolean => &[Equal, NotEqual],
            ValueType::Int => &[
                Equal, NotEqual, GreaterThan, GreaterThanOrEqual, LessThan, LessThanOrEqual, In, NotIn, IsNull, IsNotNull,
            ],
            ValueType::Float => &[Equal, NotEqual, GreaterThan, GreaterThanOrEqual, LessThan, LessThanOrEqual],
            ValueType::DateTime => &[
                Equal, NotEqual, GreaterThan, GreaterThanOrEqual, LessThan, LessThanOrEqual, IsNull, IsNotNull,
            ],
            ValueType::String => &[
                Equal, NotEqual, Contains, NotContains, StartsWith, EndsWith, In, NotIn, IsEmpty, IsNotEmpty, IsNull,
                IsNotNull,
            ],
            ValueType::IntArray | ValueType::StringArray => &[In, NotIn, AllIn, NotAllIn, IsEmpty, IsNotEmpty],
        }
    }

    pub fn allows(self, op: RuleOperator) -> bool {
        self.operators().contains(&op)
    }
}

/// Entity lists that remote select boxes page through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    CustomerRole,
    Country,
    Category,
    Manufacturer,
    Product,
    Currency,
    Store,
}

impl FromStr for DataSource {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "customerrole" => DataSource::CustomerRole,
            "country" => DataSource::Country,
            "category" => DataSource::Category,
            "manufacturer" => DataSource::Manufacturer,
            "product" => DataSource::Product,
            "currency" => DataSource::Currency,
            "store" => DataSource::Store,
            other => return Err(ServiceError::validation(format!("unknown data source: {other}"))),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SelectList {
    None,
    Remote { data_source: DataSource },
    Local { options: Vec<SelectOption> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub name: String,
    pub display_name: String,
    pub scope: RuleScope,
    pub value_type: ValueType,
    pub operators: Vec<RuleOperator>,
    pub select_list: SelectList,
}

impl RuleDescriptor {
    fn new(scope: RuleScope, name: &str, display_name: &str, value_type: ValueType) -> Self {
        let select_list = match value_type {
            ValueType::Boolean => SelectList::Local {
                options: vec![SelectOption::new("true", "Yes"), SelectOption::new("false", "No")],
            },
            _ => SelectList::None,
        };
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            scope,
            value_type,
            operators: value_type.operators().to_vec(),
            select_list,
        }
    }

    fn remote(mut self, data_source: DataSource) -> Self {
        self.select_list = SelectList::Remote { data_source };
        self
    }
}

fn customer_descriptors(scope: RuleScope) -> Vec<RuleDescriptor> {
    vec![
        RuleDescriptor::new(scope, "CustomerRole", "Customer roles", ValueType::IntArray).remote(DataSource::CustomerRole),
        RuleDescriptor::new(scope, "IsActive", "Is active", ValueType::Boolean),
        RuleDescriptor::new(scope, "TaxExempt", "Tax exempt", ValueType::Boolean),
        RuleDescriptor::new(scope, "BillingCountry", "Billing country", ValueType::Int).remote(DataSource::Country),
        RuleDescriptor::new(scope, "OrderCount", "Number of orders", ValueType::Int),
        RuleDescriptor::new(scope, "SpentAmount", "Spent amount", ValueType::Float),
        RuleDescriptor::new(scope, "Email", "Email", ValueType::String),
        RuleDescriptor::new(scope, "CreatedDays", "Days since registration", ValueType::Int),
    ]
}

/// Descriptors published for a scope. Cart rules see the cart's customer as well.
pub fn descriptors(scope: RuleScope) -> Vec<RuleDescriptor> {
    match scope {
        RuleScope::Customer => customer_descriptors(scope),
        RuleScope::Cart => {
            let mut list = customer_descriptors(scope);
            list.extend([
                RuleDescriptor::new(scope, "CartTotal", "Cart total", ValueType::Float),
                RuleDescriptor::new(scope, "CartItemCount", "Number of cart items", ValueType::Int),
                RuleDescriptor::new(scope, "CartProductIds", "Products in cart", ValueType::IntArray).remote(DataSource::Product),
                RuleDescriptor::new(scope, "CouponCode", "Coupon code", ValueType::String),
            ]);
            list
        }
        RuleScope::Product => vec![
            RuleDescriptor::new(scope, "ProductId", "Product", ValueType::Int).remote(DataSource::Product),
            RuleDescriptor::new(scope, "Category", "Categories", ValueType::IntArray).remote(DataSource::Category),
            RuleDescriptor::new(scope, "Manufacturer", "Manufacturer", ValueType::Int).remote(DataSource::Manufacturer),
            RuleDescriptor::new(scope, "Price", "Price", ValueType::Float),
            RuleDescriptor::new(scope, "Published", "Published", ValueType::Boolean),
            RuleDescriptor::new(scope, "StockQuantity", "Stock quantity", ValueType::Int),
            RuleDescriptor::new(scope, "Sku", "SKU", ValueType::String),
            RuleDescriptor::new(scope, "Name", "Name", ValueType::String),
        ],
    }
}

pub fn find_descriptor(scope: RuleScope, name: &str) -> Option<RuleDescriptor> {
    descriptors(scope).into_iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_publish_expected_names() {
        let cart: Vec<String> = descriptors(RuleScope::Cart).into_iter().map(|d| d.name).collect();
        for name in ["CustomerRole", "Email", "CartTotal", "CartProductIds", "CouponCode"] {
            assert!(cart.iter().any(|n| n == name), "{name} missing");
        }
        assert!(find_descriptor(RuleScope::Customer, "CartTotal").is_none());
        let cat = find_descriptor(RuleScope::Product, "Category").unwrap();
        assert_eq!(cat.select_list, SelectList::Remote { data_source: DataSource::Category });
        assert!(matches!(find_descriptor(RuleScope::Product, "Published").unwrap().select_list, SelectList::Local { .. }));
    }

    #[test]
    fn operator_subsets() {
        assert!(ValueType::IntArray.allows(RuleOperator::AllIn));
        assert!(!ValueType::Boolean.allows(RuleOperator::GreaterThan));
        assert!(!ValueType::Float.allows(RuleOperator::Contains));
        assert!(ValueType::String.allows(RuleOperator::StartsWith));
    }
}
