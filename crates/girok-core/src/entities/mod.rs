//! Domain entities
//!
//! Plain domain structs and enums, independent of persistence. The
//! SeaORM models in `girok-db` convert to and from these types at the
//! repository boundary.

pub mod account;
pub mod consent;
pub mod dsr;
pub mod legal;
pub mod sanction;
pub mod session;

pub use account::{Account, AccountMode, AccountStatus, CredentialKind};
pub use consent::{Consent, ConsentStatus};
pub use dsr::{
    DsrPriority, DsrRequest, DsrResponseType, DsrScope, DsrStatus, DsrType, EscalationLevel,
    LegalBasis,
};
pub use legal::{ConsentRequirement, ConsentType, Law, LawRequirements, LegalDocument};
pub use sanction::{
    ActiveSanctions, AppealStatus, Sanction, SanctionSeverity, SanctionStatus, SanctionType,
    SubjectType,
};
pub use session::{Session, SessionContext};
