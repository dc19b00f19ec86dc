//! Girok core library
//!
//! This crate contains the domain entities and trust primitives for the
//! Girok identity and compliance control plane: credential hashing, TOTP
//! and backup codes, ID generation, the shared cache with its
//! single-flight lock, the event catalog, and the event bus client.

pub mod auth;
pub mod bus;
pub mod cache;
pub mod entities;
pub mod errors;
pub mod events;
pub mod ids;

pub use errors::{CoreError, CoreResult};
