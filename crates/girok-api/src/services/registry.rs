//! Service registry client
//!
//! The platform's service registry is an external collaborator; this
//! trait is the seam it plugs into. The default implementation checks
//! an env-configured allowlist of service UUIDs, and accepts everything
//! when the allowlist is empty (development mode).

use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use crate::middleware::error_handler::ApiResult;

/// Lookup of registered platform services
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Whether a service ID is registered
    async fn is_known(&self, service_id: Uuid) -> ApiResult<bool>;
}

/// Allowlist-backed registry
pub struct AllowlistServiceRegistry {
    allowlist: HashSet<Uuid>,
}

impl AllowlistServiceRegistry {
    pub fn new(allowlist: Vec<Uuid>) -> Self {
        Self {
            allowlist: allowlist.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ServiceRegistry for AllowlistServiceRegistry {
    async fn is_known(&self, service_id: Uuid) -> ApiResult<bool> {
        if self.allowlist.is_empty() {
            return Ok(true);
        }
        Ok(self.allowlist.contains(&service_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_allowlist_accepts_everything() {
        let registry = AllowlistServiceRegistry::new(vec![]);
        assert!(registry.is_known(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_allowlist_membership() {
        let known = Uuid::new_v4();
        let registry = AllowlistServiceRegistry::new(vec![known]);

        assert!(registry.is_known(known).await.unwrap());
        assert!(!registry.is_known(Uuid::new_v4()).await.unwrap());
    }
}
