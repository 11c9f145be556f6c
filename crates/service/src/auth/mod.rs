//! Admin authentication: domain types, a repository seam and the service
//! that hashes passwords and issues JWTs.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::AuthService;
