pub mod errors;
pub mod db;

pub mod acl_record;
pub mod activity_log;
pub mod admin_user;
pub mod category;
pub mod country;
pub mod currency;
pub mod customer;
pub mod customer_role;
pub mod customer_role_mapping;
pub mod discount;
pub mod discount_rule_set;
pub mod export_profile;
pub mod import_profile;
pub mod language;
pub mod localized_property;
pub mod manufacturer;
pub mod menu;
pub mod menu_item;
pub mod message_template;
pub mod order;
pub mod product;
pub mod product_attribute;
pub mod product_attribute_option;
pub mod product_category;
pub mod recurring_payment;
pub mod recurring_payment_history;
pub mod return_request;
pub mod rule;
pub mod rule_set;
pub mod schedule_task;
pub mod shipment;
pub mod specification_attribute;
pub mod specification_attribute_option;
pub mod store;
pub mod store_mapping;
pub mod theme_variable;
pub mod topic;

#[cfg(test)]
mod tests;
