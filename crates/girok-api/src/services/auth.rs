//! Authentication service
//!
//! The registration and two-step login state machine, lockout
//! accounting, password change, and the MFA setup flow. Every state
//! change commits in one transaction together with its outbox event.
//!
//! The login primary step is timing-equalized: when the email is
//! unknown, the password is still verified against a process-constant
//! dummy hash and the attempt is recorded under the sentinel account
//! ID, so the unknown-email and wrong-password paths are
//! indistinguishable from outside.

use chrono::{Duration, Utc};
use girok_core::auth::challenge::CHALLENGE_TTL_SECS;
use girok_core::auth::{
    backup_codes, password::dummy_hash, totp, MfaChallenge, MfaMethod, PasswordHasher,
    PasswordVerifier,
};
use girok_core::cache::{Cache, CacheKeys, CacheTtl};
use girok_core::entities::account::{sentinel_account_id, Account};
use girok_core::entities::session::{Session, SessionContext};
use girok_core::events::{AggregateType, EventType};
use girok_db::repositories::{
    AccountRepository, CredentialRepository, LoginAttemptRepository, MfaSecretRepository,
    NewOutboxEvent, OutboxRepository,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::middleware::auth::ClientInfo;
use crate::middleware::error_handler::{ApiError, ApiResult};
use crate::services::session::SessionService;

/// Outcome of the login primary step
pub enum LoginOutcome {
    /// Session issued; no second factor required
    Complete(Box<SessionBundle>),
    /// Second factor required; challenge minted
    MfaRequired {
        challenge_id: String,
        methods: Vec<MfaMethod>,
    },
}

/// A freshly issued session with its one-time refresh token
pub struct SessionBundle {
    pub account: Account,
    pub session: Session,
    pub refresh_token: String,
}

/// Result of MFA provisioning
pub struct MfaProvisioning {
    pub secret: String,
    pub otpauth_uri: String,
    pub backup_codes: Vec<String>,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    accounts: AccountRepository,
    credentials: CredentialRepository,
    mfa_secrets: MfaSecretRepository,
    login_attempts: LoginAttemptRepository,
    outbox: OutboxRepository,
    sessions: SessionService,
    cache: Cache,
    hasher: PasswordHasher,
    verifier: PasswordVerifier,
    /// Verified against when the account does not exist
    timing_dummy_hash: String,
    max_login_failures: u64,
    login_window: Duration,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DatabaseConnection>,
        accounts: AccountRepository,
        credentials: CredentialRepository,
        mfa_secrets: MfaSecretRepository,
        login_attempts: LoginAttemptRepository,
        outbox: OutboxRepository,
        sessions: SessionService,
        cache: Cache,
        max_login_failures: u64,
        login_window_minutes: i64,
    ) -> ApiResult<Self> {
        let hasher = PasswordHasher::new();
        let timing_dummy_hash =
            dummy_hash(&hasher).map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(Self {
            db,
            accounts,
            credentials,
            mfa_secrets,
            login_attempts,
            outbox,
            sessions,
            cache,
            hasher,
            verifier: PasswordVerifier::new(),
            timing_dummy_hash,
            max_login_failures,
            login_window: Duration::minutes(login_window_minutes),
        })
    }

    /// Register a new local account
    ///
    /// Credential hash, account row, first session and the
    /// `ACCOUNT_REGISTERED` event commit in one transaction.
    pub async fn register(
        &self,
        email: String,
        password: String,
        username: String,
        service_id: Uuid,
        client: &ClientInfo,
    ) -> ApiResult<SessionBundle> {
        if self.accounts.find_by_email(&email).await?.is_some() {
            warn!("registration attempt for existing email");
            return Err(ApiError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = self
            .hasher
            .hash_password(&password)
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;

        let account = self
            .accounts
            .create(&txn, Account::new(email, username))
            .await?;
        self.credentials
            .create(&txn, account.id, password_hash)
            .await?;
        let (session, refresh_token) = self
            .sessions
            .create_in_txn(&txn, account.id, SessionContext::User, false, false, client)
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Account,
                    account.id,
                    EventType::AccountRegistered,
                    json!({
                        "accountId": account.id,
                        "externalId": account.external_id,
                        "serviceId": service_id,
                    }),
                ),
            )
            .await?;

        txn.commit().await.map_err(girok_db::DbError::from)?;

        info!(account_id = %account.id, "account registered");
        Ok(SessionBundle {
            account,
            session,
            refresh_token,
        })
    }

    /// Login primary step: credential verification with lockout
    /// accounting, then either a session or an MFA challenge
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> ApiResult<LoginOutcome> {
        let account = self.accounts.find_by_email(email).await?;

        let account = match account {
            Some(account) => account,
            None => {
                // Constant-time path: verify against the dummy hash and
                // record the attempt under the sentinel account
                let _ = self.verifier.verify_password(password, &self.timing_dummy_hash);
                self.login_attempts
                    .record(
                        sentinel_account_id(),
                        email,
                        client.ip_address.clone(),
                        client.user_agent.clone(),
                        false,
                        Some("unknown_email".to_string()),
                    )
                    .await?;
                return Err(ApiError::InvalidCredentials);
            }
        };

        let now = Utc::now();
        if account.is_locked(now) {
            let retry_after_secs = account
                .locked_until
                .map(|until| (until - now).num_seconds().max(0))
                .unwrap_or(self.login_window.num_seconds());
            return Err(ApiError::AccountLocked { retry_after_secs });
        }

        let credential = self.credentials.find_by_account(account.id).await?;
        let stored_hash = credential
            .as_ref()
            .map(|c| c.password_hash.as_str())
            .unwrap_or(&self.timing_dummy_hash);

        if self.verifier.verify_password(password, stored_hash).is_err()
            || credential.is_none()
        {
            return Err(self.register_failure(&account, email, client).await?);
        }

        if !account.can_authenticate(now) {
            warn!(account_id = %account.id, "login attempt on inactive account");
            return Err(ApiError::InvalidCredentials);
        }

        if account.mfa_enabled {
            let challenge = MfaChallenge::new(
                account.id,
                account.email.clone(),
                vec![MfaMethod::Totp, MfaMethod::BackupCode],
            );
            self.cache
                .set_json(
                    &CacheKeys::mfa_challenge(&challenge.id),
                    &challenge,
                    StdDuration::from_secs(CHALLENGE_TTL_SECS),
                )
                .await?;

            info!(account_id = %account.id, "MFA challenge minted");
            return Ok(LoginOutcome::MfaRequired {
                challenge_id: challenge.id,
                methods: challenge.methods,
            });
        }

        let bundle = self
            .issue_session(&account, client, false, false, "password")
            .await?;
        Ok(LoginOutcome::Complete(Box::new(bundle)))
    }

    /// Login second step: consume the challenge and verify the factor
    pub async fn login_mfa(
        &self,
        challenge_id: &str,
        code: &str,
        method: MfaMethod,
        client: &ClientInfo,
    ) -> ApiResult<SessionBundle> {
        let key = CacheKeys::mfa_challenge(challenge_id);
        let challenge: MfaChallenge = self
            .cache
            .get_json(&key)
            .await?
            .ok_or(ApiError::InvalidChallenge)?;

        if challenge.is_expired() {
            let _ = self.cache.delete(&key).await;
            return Err(ApiError::InvalidChallenge);
        }
        if !challenge.allows(method) {
            return Err(ApiError::InvalidChallenge);
        }

        let account = self
            .accounts
            .find_by_id(challenge.account_id)
            .await?
            .ok_or(ApiError::InvalidChallenge)?;

        let verified = self.verify_second_factor(&account, code, method).await?;
        if !verified {
            self.record_mfa_failure(&account, client).await?;
            return Err(ApiError::InvalidMfaCode);
        }

        // Single-use: the challenge dies with its consumption
        let _ = self.cache.delete(&key).await;

        let bundle = self
            .issue_session(&account, client, true, true, "mfa")
            .await?;
        Ok(bundle)
    }

    /// Destroy a session; success even when it is already gone
    pub async fn logout(&self, session_id: Uuid, token_jti: Option<&str>) -> ApiResult<()> {
        let session = self.sessions.revoke(session_id).await?;

        if let Some(jti) = token_jti {
            self.cache
                .revoke_token(jti, StdDuration::from_secs(3600))
                .await?;
        }

        if session {
            let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
            self.outbox
                .append(
                    &txn,
                    NewOutboxEvent::new(
                        AggregateType::Session,
                        session_id,
                        EventType::Logout,
                        json!({ "sessionId": session_id }),
                    ),
                )
                .await?;
            txn.commit().await.map_err(girok_db::DbError::from)?;
        }

        info!(session_id = %session_id, "logout");
        Ok(())
    }

    /// Change the password: re-verify, re-hash with current KDF
    /// defaults, revoke all other sessions
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
        current_session_id: Uuid,
    ) -> ApiResult<()> {
        self.verify_current_password(account_id, current_password)
            .await?;

        let new_hash = self
            .hasher
            .hash_password(new_password)
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        self.credentials
            .update_hash(&txn, account_id, new_hash)
            .await?;
        let revoked = self
            .sessions
            .revoke_all_except_in_txn(&txn, account_id, Some(current_session_id))
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Account,
                    account_id,
                    EventType::PasswordChanged,
                    json!({ "accountId": account_id, "revokedSessions": revoked }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        info!(account_id = %account_id, revoked, "password changed");
        Ok(())
    }

    /// MFA setup: provision a secret and backup codes without enabling
    pub async fn mfa_setup(&self, account_id: Uuid) -> ApiResult<MfaProvisioning> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("account".to_string()))?;

        if account.mfa_enabled {
            return Err(ApiError::Conflict("MFA is already enabled".to_string()));
        }

        let secret = totp::generate_secret();
        let code_set = backup_codes::generate();

        self.mfa_secrets
            .provision(account_id, secret.clone(), code_set.hashes)
            .await?;

        Ok(MfaProvisioning {
            otpauth_uri: totp::provisioning_uri(&secret, &account.email),
            secret,
            backup_codes: code_set.codes,
        })
    }

    /// MFA setup verification: a valid TOTP moves PROVISIONED to ENABLED
    ///
    /// The session that completed setup counts as MFA-verified.
    pub async fn mfa_verify_setup(
        &self,
        account_id: Uuid,
        code: &str,
        session_id: Uuid,
    ) -> ApiResult<()> {
        let secret = self
            .mfa_secrets
            .find_by_account(account_id)
            .await?
            .ok_or_else(|| {
                ApiError::Precondition("MFA has not been provisioned".to_string())
            })?;

        if secret.enabled {
            return Err(ApiError::Conflict("MFA is already enabled".to_string()));
        }
        if !totp::verify(&secret.secret, code)? {
            return Err(ApiError::InvalidMfaCode);
        }

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        self.mfa_secrets.enable(&txn, account_id).await?;
        self.accounts.set_mfa_enabled(&txn, account_id, true).await?;
        self.sessions.set_mfa_verified_in_txn(&txn, session_id).await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Account,
                    account_id,
                    EventType::MfaEnabled,
                    json!({ "accountId": account_id }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_account(account_id).await;
        info!(account_id = %account_id, "MFA enabled");
        Ok(())
    }

    /// Disable MFA; destroys the secret and every backup code
    pub async fn mfa_disable(&self, account_id: Uuid, password: &str) -> ApiResult<()> {
        self.verify_current_password(account_id, password).await?;

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        self.mfa_secrets.delete(&txn, account_id).await?;
        self.accounts
            .set_mfa_enabled(&txn, account_id, false)
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Account,
                    account_id,
                    EventType::MfaDisabled,
                    json!({ "accountId": account_id }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_account(account_id).await;
        info!(account_id = %account_id, "MFA disabled");
        Ok(())
    }

    /// Swap the full backup-code set; old hashes are discarded
    pub async fn regenerate_backup_codes(
        &self,
        account_id: Uuid,
        password: &str,
    ) -> ApiResult<Vec<String>> {
        self.verify_current_password(account_id, password).await?;

        let secret = self
            .mfa_secrets
            .find_by_account(account_id)
            .await?
            .filter(|s| s.enabled)
            .ok_or_else(|| ApiError::Precondition("MFA is not enabled".to_string()))?;

        let code_set = backup_codes::generate();

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        self.mfa_secrets
            .replace_backup_codes(&txn, secret.account_id, code_set.hashes)
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        Ok(code_set.codes)
    }

    /// Account projection, read through the cache
    ///
    /// The domain account carries no credential material, so the cached
    /// value graph never contains a password hash.
    pub async fn get_account(&self, account_id: Uuid) -> ApiResult<Account> {
        let key = CacheKeys::account_id(&account_id);
        let accounts = self.accounts.clone();

        let account: Option<Account> = self
            .cache
            .get_or_compute(&key, CacheTtl::USER_DATA, || async move {
                accounts
                    .find_by_id(account_id)
                    .await
                    .map_err(|e| girok_core::CoreError::internal(e.to_string()))
            })
            .await?;

        account.ok_or_else(|| ApiError::NotFound("account".to_string()))
    }

    // Internal helpers

    async fn invalidate_account(&self, account_id: Uuid) {
        if let Err(e) = self.cache.delete(&CacheKeys::account_id(&account_id)).await {
            tracing::debug!(error = %e, "account cache invalidation failed");
        }
    }

    async fn verify_current_password(&self, account_id: Uuid, password: &str) -> ApiResult<()> {
        let credential = self
            .credentials
            .find_by_account(account_id)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        self.verifier
            .verify_password(password, &credential.password_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;
        Ok(())
    }

    async fn verify_second_factor(
        &self,
        account: &Account,
        code: &str,
        method: MfaMethod,
    ) -> ApiResult<bool> {
        let secret = self
            .mfa_secrets
            .find_by_account(account.id)
            .await?
            .filter(|s| s.enabled)
            .ok_or(ApiError::InvalidChallenge)?;

        match method {
            MfaMethod::Totp => Ok(totp::verify(&secret.secret, code)?),
            MfaMethod::BackupCode => {
                let mut hashes = secret.hashes();
                match backup_codes::verify(code, &hashes) {
                    Some(index) => {
                        // Single-use: drop the matched digest
                        hashes.remove(index);
                        let txn =
                            self.db.begin().await.map_err(girok_db::DbError::from)?;
                        self.mfa_secrets
                            .replace_backup_codes(&txn, account.id, hashes)
                            .await?;
                        txn.commit().await.map_err(girok_db::DbError::from)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    /// Record a failed primary attempt; applies the lockout when the
    /// rolling count crosses the threshold
    async fn register_failure(
        &self,
        account: &Account,
        email: &str,
        client: &ClientInfo,
    ) -> ApiResult<ApiError> {
        self.login_attempts
            .record(
                account.id,
                email,
                client.ip_address.clone(),
                client.user_agent.clone(),
                false,
                Some("invalid_password".to_string()),
            )
            .await?;

        let failures = self
            .login_attempts
            .rolling_failures(account.id, self.login_window)
            .await?;

        if failures >= self.max_login_failures {
            let locked_until = Utc::now() + self.login_window;
            self.accounts
                .set_locked_until(account.id, Some(locked_until))
                .await?;
            warn!(account_id = %account.id, failures, "account locked");
            return Ok(ApiError::AccountLocked {
                retry_after_secs: self.login_window.num_seconds(),
            });
        }

        Ok(ApiError::InvalidCredentials)
    }

    async fn record_mfa_failure(&self, account: &Account, client: &ClientInfo) -> ApiResult<()> {
        self.login_attempts
            .record(
                account.id,
                &account.email,
                client.ip_address.clone(),
                client.user_agent.clone(),
                false,
                Some("invalid_mfa_code".to_string()),
            )
            .await?;

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Account,
                    account.id,
                    EventType::MfaFailed,
                    json!({ "accountId": account.id }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;
        Ok(())
    }

    /// Create the session, record the successful attempt, and emit
    /// `LOGIN_SUCCESS`, all in one transaction
    async fn issue_session(
        &self,
        account: &Account,
        client: &ClientInfo,
        mfa_required: bool,
        mfa_verified: bool,
        method: &str,
    ) -> ApiResult<SessionBundle> {
        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;

        let context = if account.is_operator() {
            SessionContext::Operator
        } else {
            SessionContext::User
        };
        let (session, refresh_token) = self
            .sessions
            .create_in_txn(&txn, account.id, context, mfa_required, mfa_verified, client)
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Account,
                    account.id,
                    EventType::LoginSuccess,
                    json!({
                        "accountId": account.id,
                        "sessionId": session.id,
                        "method": method,
                    }),
                ),
            )
            .await?;

        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.login_attempts
            .record(
                account.id,
                &account.email,
                client.ip_address.clone(),
                client.user_agent.clone(),
                true,
                None,
            )
            .await?;

        info!(account_id = %account.id, session_id = %session.id, "login success");
        Ok(SessionBundle {
            account: account.clone(),
            session,
            refresh_token,
        })
    }
}
