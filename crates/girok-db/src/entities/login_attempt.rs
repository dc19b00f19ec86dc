//! Login attempt entity model for SeaORM
//!
//! Append-only accounting feed for the rolling-failure lockout. Unknown
//! emails are recorded under the sentinel account ID so the log never
//! leaks which emails exist.

use super::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "login_attempts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub account_id: Uuid,

    /// Email exactly as entered by the caller
    pub email: String,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    pub success: bool,

    pub failure_reason: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
