//! DSR request audit-log entity model for SeaORM
//!
//! Append-only: rows are inserted by every state-changing DSR
//! operation and never updated or deleted.

use super::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dsr_request_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub request_id: Uuid,

    pub action: String,

    pub operator_id: Option<Uuid>,

    #[sea_orm(column_type = "JsonBinary")]
    pub details: Json,

    pub ip_address: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dsr_request::Entity",
        from = "Column::RequestId",
        to = "super::dsr_request::Column::Id"
    )]
    Request,
}

impl Related<super::dsr_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
