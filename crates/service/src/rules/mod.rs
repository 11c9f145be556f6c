//! Rule sets: persisted boolean filters over customers, products and carts.

pub mod descriptor;
pub mod engine;
pub mod expression;
pub mod facts;
pub mod operator;
pub mod options;
pub mod provider;
pub mod service;

pub use engine::RuleEngine;
