//! Identifier generation
//!
//! Time-ordered UUIDv7 primary keys and short Base62 external IDs
//! exposed to clients.

pub mod external;
pub mod uuid7;

pub use external::ExternalId;
