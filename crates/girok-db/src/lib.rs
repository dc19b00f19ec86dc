//! Girok persistence layer
//!
//! SeaORM entities and repositories for the trust and compliance
//! aggregates, plus the transactional outbox. Repositories convert
//! between database models and the domain types in `girok-core`.

pub mod connection;
pub mod entities;
pub mod error;
pub mod repositories;

pub use connection::{establish_connection, DatabaseConnection};
pub use error::{DbError, DbResult};
