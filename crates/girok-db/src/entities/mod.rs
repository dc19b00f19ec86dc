//! SeaORM entity models for Girok
//!
//! String-backed enums mirror the domain enums in `girok-core`;
//! conversions live next to each model. JSON columns are parsed into
//! typed values at the repository boundary, never passed through raw.

pub mod account;
pub mod consent;
pub mod credential;
pub mod dsr_request;
pub mod dsr_request_log;
pub mod law;
pub mod legal_document;
pub mod login_attempt;
pub mod mfa_secret;
pub mod outbox_event;
pub mod sanction;
pub mod session;

// Common imports for all entities
pub use sea_orm::entity::prelude::*;
pub use sea_orm::{NotSet, Set, Unchanged};
pub use serde::{Deserialize, Serialize};
