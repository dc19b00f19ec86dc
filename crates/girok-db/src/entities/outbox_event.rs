//! Outbox event entity model for SeaORM
//!
//! Rows append inside the same transaction as the state change they
//! announce. The publisher marks `published_at` after delivery; rows
//! are never deleted by the engine.

use super::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outbox_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub aggregate_type: String,

    pub aggregate_id: Uuid,

    pub event_type: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub published_at: Option<chrono::DateTime<chrono::Utc>>,

    pub retry_count: i32,

    pub next_attempt_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}
