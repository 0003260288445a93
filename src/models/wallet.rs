use crate::entities::{CashbackState, EntryStatus, EntryType, transaction_entry_entity, wallet_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub user_id: i64,
    /// 余额（paise）
    pub balance: i64,
    pub version: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<wallet_entity::Model> for WalletResponse {
    fn from(m: wallet_entity::Model) -> Self {
        Self {
            user_id: m.user_id,
            balance: m.balance,
            version: m.version,
            updated_at: Some(m.updated_at),
        }
    }
}

impl WalletResponse {
    /// 尚未发生任何资金事件的用户
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            balance: 0,
            version: 0,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionEntryResponse {
    pub id: i64,
    pub entry_type: EntryType,
    /// 金额（paise，正数；方向由 entry_type 决定）
    pub amount: i64,
    pub balance_after: Option<i64>,
    pub status: EntryStatus,
    pub reference: Option<String>,
    pub cashback_state: Option<CashbackState>,
    pub description: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<transaction_entry_entity::Model> for TransactionEntryResponse {
    fn from(m: transaction_entry_entity::Model) -> Self {
        Self {
            id: m.id,
            entry_type: m.entry_type,
            amount: m.amount,
            balance_after: m.balance_after,
            status: m.status,
            reference: m.reference,
            cashback_state: m.cashback_state,
            description: m.description,
            metadata: m.metadata,
            created_at: m.created_at,
            processed_at: m.processed_at,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TransactionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub entry_type: Option<EntryType>,
    pub status: Option<EntryStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reconciliation {
    pub user_id: i64,
    pub stored_balance: i64,
    pub computed_balance: i64,
    /// stored - computed，非零即为缺陷
    pub drift: i64,
}

impl Reconciliation {
    pub fn new(user_id: i64, stored_balance: i64, computed_balance: i64) -> Self {
        Self {
            user_id,
            stored_balance,
            computed_balance,
            drift: stored_balance - computed_balance,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueCashbackRequest {
    pub user_id: i64,
    pub amount: i64,
    /// 幂等引用（例如触发返现的业务交易号）
    pub reference: Option<String>,
    pub campaign: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClaimCashbackResponse {
    pub entry: TransactionEntryResponse,
    pub new_balance: i64,
}
