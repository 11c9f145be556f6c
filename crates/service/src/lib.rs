//! Service layer of the store back office.
//! - Business rules and validation on top of the `models` entities.
//! - Free async functions taking a connection, grouped per admin area.
//! - Errors surface as [`errors::ServiceError`].

pub mod errors;
pub mod grid;
pub mod notifier;
pub mod localization;
pub mod mapping;
pub mod activity;
pub mod store;
pub mod customer;
pub mod catalog;
pub mod directory;
pub mod discount;
pub mod cms;
pub mod sales;
pub mod rules;
pub mod exchange;
pub mod media;
pub mod auth;
#[cfg(test)]
pub mod test_support;
