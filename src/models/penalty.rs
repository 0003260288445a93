use crate::entities::penalty_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplyPenaltyRequest {
    pub user_id: i64,
    /// 金额（paise）
    pub amount: i64,
    pub reason: String,
    #[schema(example = "LATE_DOCUMENT")]
    pub penalty_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PenaltyResponse {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub reason: String,
    pub penalty_type: String,
    pub applied_by: i64,
    pub entry_id: Option<i64>,
    pub email_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl From<penalty_entity::Model> for PenaltyResponse {
    fn from(m: penalty_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            amount: m.amount,
            reason: m.reason,
            penalty_type: m.penalty_type,
            applied_by: m.applied_by,
            entry_id: m.entry_id,
            email_sent: m.email_sent,
            created_at: m.created_at,
        }
    }
}
