//! Application state shared across request handlers and workers

use girok_core::auth::{TokenConfig, TokenService};
use girok_core::bus::{EventBus, RedisEventBus};
use girok_core::cache::{Cache, RedisCache};
use girok_db::connection::PoolConfig;
use girok_db::repositories::{
    AccountRepository, ConsentRepository, CredentialRepository, DsrRepository, LawRepository,
    LegalDocumentRepository, LoginAttemptRepository, MfaSecretRepository, OutboxRepository,
    SanctionRepository, SessionRepository,
};
use sea_orm::DatabaseConnection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::ApiConfig;
use crate::services::{
    AllowlistServiceRegistry, AuthService, ConsentService, DsrService, LegalService,
    SanctionService, ServiceRegistry, SessionService,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<ApiConfig>,
    cache: Cache,
    bus: Arc<dyn EventBus>,
    tokens: TokenService,
    registry: Arc<dyn ServiceRegistry>,
    outbox: OutboxRepository,
    auth: AuthService,
    sessions: SessionService,
    sanctions: SanctionService,
    legal: LegalService,
    consents: ConsentService,
    dsr: DsrService,
    /// Readiness flips to false on SIGTERM so load balancers drain us
    ready: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    /// Connect the shared resources and wire the services
    pub async fn new(config: ApiConfig) -> Result<Self, AppStateError> {
        let pool_config = PoolConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            min_connections: config.database.min_connections,
            ..PoolConfig::new(config.database.url.clone())
        };
        let db = Arc::new(girok_db::establish_connection(&pool_config).await?);

        let redis_url = config.redis.url();
        let cache = Cache::new(Arc::new(
            RedisCache::new(&redis_url)
                .await
                .map_err(AppStateError::Cache)?,
        ));
        let bus: Arc<dyn EventBus> = Arc::new(
            RedisEventBus::new(&redis_url)
                .await
                .map_err(AppStateError::Cache)?,
        );

        let tokens = TokenService::new(TokenConfig::new(config.auth.jwt_secret.clone()));
        let registry: Arc<dyn ServiceRegistry> = Arc::new(AllowlistServiceRegistry::new(
            config.auth.service_allowlist.clone(),
        ));

        let outbox = OutboxRepository::new(db.clone());
        let sessions = SessionService::new(SessionRepository::new(db.clone()), cache.clone());
        let auth = AuthService::new(
            db.clone(),
            AccountRepository::new(db.clone()),
            CredentialRepository::new(db.clone()),
            MfaSecretRepository::new(db.clone()),
            LoginAttemptRepository::new(db.clone()),
            outbox.clone(),
            sessions.clone(),
            cache.clone(),
            config.auth.max_login_failures,
            config.auth.login_window_minutes,
        )
        .map_err(|e| AppStateError::Configuration(e.to_string()))?;

        let sanctions = SanctionService::new(
            db.clone(),
            SanctionRepository::new(db.clone()),
            outbox.clone(),
            cache.clone(),
        );
        let legal = LegalService::new(
            db.clone(),
            LegalDocumentRepository::new(db.clone()),
            LawRepository::new(db.clone()),
            cache.clone(),
        );
        let consents = ConsentService::new(
            db.clone(),
            ConsentRepository::new(db.clone()),
            outbox.clone(),
            legal.clone(),
            cache.clone(),
        );
        let dsr = DsrService::new(
            db.clone(),
            DsrRepository::new(db.clone()),
            outbox.clone(),
            cache.clone(),
        );

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            db,
            config: Arc::new(config),
            cache,
            bus,
            tokens,
            registry,
            outbox,
            auth,
            sessions,
            sanctions,
            legal,
            consents,
            dsr,
            ready: Arc::new(AtomicBool::new(true)),
            shutdown_tx,
        })
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn registry(&self) -> &Arc<dyn ServiceRegistry> {
        &self.registry
    }

    pub fn outbox(&self) -> &OutboxRepository {
        &self.outbox
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    pub fn sanctions(&self) -> &SanctionService {
        &self.sanctions
    }

    pub fn legal(&self) -> &LegalService {
        &self.legal
    }

    pub fn consents(&self) -> &ConsentService {
        &self.consents
    }

    pub fn dsr(&self) -> &DsrService {
        &self.dsr
    }

    /// Whether the process should accept new traffic
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Flip readiness; `/health/ready` answers 503 once false
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Receiver for workers to observe shutdown
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Tell every worker to finish its batch and stop
    pub fn begin_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("Failed to establish database connection: {0}")]
    Database(#[from] girok_db::DbError),
    #[error("Failed to connect cache or bus: {0}")]
    Cache(girok_core::CoreError),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_error_display() {
        let error = AppStateError::Configuration("bad secret".to_string());
        assert!(error.to_string().contains("bad secret"));
    }
}
