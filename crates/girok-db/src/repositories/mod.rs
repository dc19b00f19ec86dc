//! Repository layer
//!
//! One repository per aggregate plus the transactional outbox. Methods
//! that must commit together with other writes take a
//! `&impl ConnectionTrait` so callers can pass their open transaction.

pub mod account;
pub mod consent;
pub mod credential;
pub mod dsr;
pub mod law;
pub mod legal_document;
pub mod login_attempt;
pub mod mfa_secret;
pub mod outbox;
pub mod sanction;
pub mod session;

pub use account::AccountRepository;
pub use consent::ConsentRepository;
pub use credential::CredentialRepository;
pub use dsr::{DsrFilter, DsrRepository, DsrStatistics};
pub use law::LawRepository;
pub use legal_document::LegalDocumentRepository;
pub use login_attempt::LoginAttemptRepository;
pub use mfa_secret::MfaSecretRepository;
pub use outbox::{NewOutboxEvent, OutboxRepository};
pub use sanction::{SanctionFilter, SanctionRepository};
pub use session::SessionRepository;
