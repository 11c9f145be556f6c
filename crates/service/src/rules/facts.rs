//! Values rules are evaluated against.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A single fact as seen by an operator.
#[derive(Clone, Debug, PartialEq)]
pub enum FactValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<FixedOffset>),
    IntList(Vec<i64>),
    StrList(Vec<String>),
}

impl From<Option<i32>> for FactValue {
    fn from(v: Option<i32>) -> Self {
        v.map_or(FactValue::Null, |v| FactValue::Int(v as i64))
    }
}

impl From<Option<String>> for FactValue {
    fn from(v: Option<String>) -> Self {
        v.map_or(FactValue::Null, FactValue::Str)
    }
}

fn ids(v: &[i32]) -> FactValue {
    FactValue::IntList(v.iter().map(|i| *i as i64).collect())
}

/// Lookup by descriptor name. Unknown names are `Null`.
pub trait Facts {
    fn fact(&self, name: &str) -> FactValue;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerFacts {
    pub customer_id: i32,
    pub role_ids: Vec<i32>,
    pub is_active: bool,
    pub tax_exempt: bool,
    pub billing_country_id: Option<i32>,
    pub order_count: i64,
    pub spent_amount: f64,
    pub email: Option<String>,
    pub created_days: i64,
}

impl Facts for CustomerFacts {
    fn fact(&self, name: &str) -> FactValue {
        match name {
            "CustomerRole" => ids(&self.role_ids),
            "IsActive" => FactValue::Bool(self.is_active),
            "TaxExempt" => FactValue::Bool(self.tax_exempt),
            "BillingCountry" => self.billing_country_id.into(),
            "OrderCount" => FactValue::Int(self.order_count),
            "SpentAmount" => FactValue::Float(self.spent_amount),
            "Email" => self.email.clone().into(),
            "CreatedDays" => FactValue::Int(self.created_days),
            _ => FactValue::Null,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFacts {
    pub id: i32,
    pub category_ids: Vec<i32>,
    pub manufacturer_id: Option<i32>,
    pub price: f64,
    pub published: bool,
    pub stock_quantity: i32,
    pub sku: Option<String>,
    pub name: String,
}

impl Facts for ProductFacts {
    fn fact(&self, name: &str) -> FactValue {
        match name {
            "ProductId" => FactValue::Int(self.id as i64),
            "Category" => ids(&self.category_ids),
            "Manufacturer" => self.manufacturer_id.into(),
            "Price" => FactValue::Float(self.price),
            "Published" => FactValue::Bool(self.published),
            "StockQuantity" => FactValue::Int(self.stock_quantity as i64),
            "Sku" => self.sku.clone().into(),
            "Name" => FactValue::Str(self.name.clone()),
            _ => FactValue::Null,
        }
    }
}

/// Caller-supplied cart snapshot. Customer facts fall through to `customer`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartFacts {
    pub customer: CustomerFacts,
    pub total: f64,
    pub item_count: i64,
    pub product_ids: Vec<i32>,
    pub coupon_code: Option<String>,
}

impl Facts for CartFacts {
    fn fact(&self, name: &str) -> FactValue {
        match name {
            "CartTotal" => FactValue::Float(self.total),
            "CartItemCount" => FactValue::Int(self.item_count),
            "CartProductIds" => ids(&self.product_ids),
            "CouponCode" => self.coupon_code.clone().into(),
            other => self.customer.fact(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_falls_back_to_customer() {
        let cart = CartFacts {
            customer: CustomerFacts { role_ids: vec![3], email: Some("a@b.c".into()), ..Default::default() },
            total: 12.5,
            ..Default::default()
        };
        assert_eq!(cart.fact("CartTotal"), FactValue::Float(12.5));
        assert_eq!(cart.fact("CustomerRole"), FactValue::IntList(vec![3]));
        assert_eq!(cart.fact("CouponCode"), FactValue::Null);
        assert_eq!(cart.fact("Nope"), FactValue::Null);
    }
}
