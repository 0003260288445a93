use crate::entities::{RechargeStatus, recharge_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartRechargeRequest {
    #[schema(example = "JIO")]
    pub operator: String,
    #[schema(example = "9876543210")]
    pub mobile: String,
    /// 金额（paise）
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RechargeResponse {
    pub recharge_id: String,
    pub operator: String,
    pub mobile: String,
    pub amount: i64,
    pub commission: i64,
    pub status: RechargeStatus,
    pub provider_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<recharge_entity::Model> for RechargeResponse {
    fn from(m: recharge_entity::Model) -> Self {
        Self {
            recharge_id: m.recharge_id,
            operator: m.operator,
            mobile: m.mobile,
            amount: m.amount,
            commission: m.commission,
            status: m.status,
            provider_ref: m.provider_ref,
            created_at: m.created_at,
        }
    }
}

/// 充值渠道异步回调
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RechargeCallback {
    pub recharge_id: String,
    pub status: String,
    pub provider_ref: Option<String>,
    pub signature: String,
}
