//! Business services
//!
//! Each service owns the repositories, cache keys and outbox writes of
//! one aggregate family. Multi-write operations open one database
//! transaction and append their outbox row inside it, so a committed
//! state change always carries its event.

pub mod auth;
pub mod consent;
pub mod dsr;
pub mod legal;
pub mod registry;
pub mod sanction;
pub mod session;

pub use auth::AuthService;
pub use consent::ConsentService;
pub use dsr::DsrService;
pub use legal::LegalService;
pub use registry::{AllowlistServiceRegistry, ServiceRegistry};
pub use sanction::SanctionService;
pub use session::SessionService;
