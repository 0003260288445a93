use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(24))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    #[sea_orm(string_value = "DEPOSIT")]
    Deposit,
    #[sea_orm(string_value = "WITHDRAWAL")]
    Withdrawal,
    #[sea_orm(string_value = "COMMISSION")]
    Commission,
    #[sea_orm(string_value = "CASHBACK")]
    Cashback,
    #[sea_orm(string_value = "REFUND")]
    Refund,
    #[sea_orm(string_value = "PENALTY")]
    Penalty,
    #[sea_orm(string_value = "SCHEME_PAYMENT")]
    SchemePayment,
    #[sea_orm(string_value = "RECHARGE")]
    Recharge,
}

impl EntryType {
    pub const DEBITS: [EntryType; 4] = [
        EntryType::Withdrawal,
        EntryType::Penalty,
        EntryType::SchemePayment,
        EntryType::Recharge,
    ];

    pub fn is_debit(self) -> bool {
        Self::DEBITS.contains(&self)
    }

    /// 按类型给金额加符号：入账为正，出账为负
    pub fn signed(self, amount: i64) -> i64 {
        if self.is_debit() { -amount } else { amount }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryType::Deposit => "DEPOSIT",
            EntryType::Withdrawal => "WITHDRAWAL",
            EntryType::Commission => "COMMISSION",
            EntryType::Cashback => "CASHBACK",
            EntryType::Refund => "REFUND",
            EntryType::Penalty => "PENALTY",
            EntryType::SchemePayment => "SCHEME_PAYMENT",
            EntryType::Recharge => "RECHARGE",
        };
        write!(f, "{s}")
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

impl EntryStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EntryStatus::Pending)
    }
}

/// 刮刮卡（返现）状态机：CREATED -> REVEALED -> CLAIMED，未领取前可作废
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashbackState {
    #[sea_orm(string_value = "CREATED")]
    Created,
    #[sea_orm(string_value = "REVEALED")]
    Revealed,
    #[sea_orm(string_value = "CLAIMED")]
    Claimed,
    #[sea_orm(string_value = "VOIDED")]
    Voided,
}

impl CashbackState {
    pub fn is_claimable(self) -> bool {
        matches!(self, CashbackState::Created | CashbackState::Revealed)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "transaction_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub wallet_id: i64,
    pub entry_type: EntryType,
    pub amount: i64,
    pub balance_after: Option<i64>,
    pub status: EntryStatus,
    pub reference: Option<String>,
    pub cashback_state: Option<CashbackState>,
    pub description: Option<String>,
    pub metadata: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 对余额的有符号贡献；未完成的条目不计入
    pub fn signed_amount(&self) -> i64 {
        match self.status {
            EntryStatus::Completed => self.entry_type.signed(self.amount),
            _ => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id"
    )]
    Wallet,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_types_are_negative() {
        for t in EntryType::DEBITS {
            assert!(t.is_debit());
            assert_eq!(t.signed(100), -100);
        }
        for t in [
            EntryType::Deposit,
            EntryType::Commission,
            EntryType::Cashback,
            EntryType::Refund,
        ] {
            assert!(!t.is_debit());
            assert_eq!(t.signed(100), 100);
        }
    }

    #[test]
    fn test_only_completed_entries_count() {
        let mut entry = Model {
            id: 1,
            user_id: 1,
            wallet_id: 1,
            entry_type: EntryType::Cashback,
            amount: 500,
            balance_after: None,
            status: EntryStatus::Pending,
            reference: None,
            cashback_state: Some(CashbackState::Created),
            description: None,
            metadata: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        assert_eq!(entry.signed_amount(), 0);
        entry.status = EntryStatus::Completed;
        assert_eq!(entry.signed_amount(), 500);
        entry.entry_type = EntryType::Penalty;
        assert_eq!(entry.signed_amount(), -500);
    }

    #[test]
    fn test_cashback_claimable_states() {
        assert!(CashbackState::Created.is_claimable());
        assert!(CashbackState::Revealed.is_claimable());
        assert!(!CashbackState::Claimed.is_claimable());
        assert!(!CashbackState::Voided.is_claimable());
    }
}
