//! HTTP middleware and request-context helpers

pub mod auth;
pub mod error_handler;
pub mod policy;
pub mod request_id;

pub use auth::{
    require_operator_id, require_service_id, require_session, require_subject_id,
    require_verified_session, ClientInfo,
};
pub use error_handler::{ApiError, ApiResult};
pub use policy::PolicyGuard;
pub use request_id::RequestId;
