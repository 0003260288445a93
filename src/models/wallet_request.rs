use crate::entities::{WalletRequestStatus, WalletRequestType, wallet_request_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitWalletRequest {
    pub request_type: WalletRequestType,
    /// 金额（paise）
    pub amount: i64,
    #[schema(example = "UPI")]
    pub payment_method: Option<String>,
    /// 用户填写的 UTR / 银行流水号
    pub transaction_reference: Option<String>,
    pub evidence_url: Option<String>,
    pub remarks: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for WalletRequestStatus {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Approved => WalletRequestStatus::Approved,
            Decision::Rejected => WalletRequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecideWalletRequest {
    pub outcome: Decision,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletRequestResponse {
    pub id: i64,
    pub user_id: i64,
    pub request_type: WalletRequestType,
    pub amount: i64,
    pub status: WalletRequestStatus,
    pub payment_method: Option<String>,
    pub transaction_reference: Option<String>,
    pub evidence_url: Option<String>,
    pub remarks: Option<String>,
    pub approver_id: Option<i64>,
    pub entry_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<wallet_request_entity::Model> for WalletRequestResponse {
    fn from(m: wallet_request_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            request_type: m.request_type,
            amount: m.amount,
            status: m.status,
            payment_method: m.payment_method,
            transaction_reference: m.transaction_reference,
            evidence_url: m.evidence_url,
            remarks: m.remarks,
            approver_id: m.approver_id,
            entry_id: m.entry_id,
            created_at: m.created_at,
            decided_at: m.decided_at,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct WalletRequestQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<WalletRequestStatus>,
    pub request_type: Option<WalletRequestType>,
    pub user_id: Option<i64>,
}
