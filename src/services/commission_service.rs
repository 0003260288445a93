use crate::entities::{
    CashbackState, EntryStatus, EntryType, transaction_entry_entity as entries,
};
use crate::error::{AppError, AppResult};
use crate::models::{ClaimCashbackResponse, EntryMetadata, IssueCashbackRequest};
use crate::services::ledger_service::{LedgerService, NewEntry};
use crate::services::wallet_service::{DeltaRequest, WalletService};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    TransactionTrait,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Success,
    Failure,
}

/// 业务交易结束后的佣金 / 退款，以及返现刮刮卡
#[derive(Clone)]
pub struct CommissionService {
    pool: DatabaseConnection,
}

impl CommissionService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 业务交易（充值、办事缴费）进入终态时调用
    ///
    /// 成功：发放佣金（金额为 0 时跳过）；失败：按原扣款金额退款。
    /// 以 domain_txn_id 为引用，重复调用不会重复记账。
    pub async fn on_transaction_outcome(
        &self,
        domain_txn_id: &str,
        outcome: TransactionOutcome,
        commission_amount: i64,
        user_id: i64,
    ) -> AppResult<Option<entries::Model>> {
        let txn = self.pool.begin().await?;
        let entry =
            Self::apply_outcome_in(&txn, domain_txn_id, outcome, commission_amount, user_id)
                .await?;
        txn.commit().await?;
        Ok(entry)
    }

    pub async fn apply_outcome_in(
        txn: &DatabaseTransaction,
        domain_txn_id: &str,
        outcome: TransactionOutcome,
        commission_amount: i64,
        user_id: i64,
    ) -> AppResult<Option<entries::Model>> {
        match outcome {
            TransactionOutcome::Success => {
                if commission_amount <= 0 {
                    return Ok(None);
                }
                let delta = DeltaRequest::new(user_id, commission_amount, EntryType::Commission)
                    .reference(domain_txn_id)
                    .metadata(EntryMetadata::Commission {
                        domain_txn_id: domain_txn_id.to_string(),
                    })
                    .description(format!("Commission for {domain_txn_id}"));
                Ok(Some(WalletService::apply_delta_in(txn, &delta).await?))
            }
            TransactionOutcome::Failure => {
                let mut original = None;
                for t in [EntryType::Recharge, EntryType::SchemePayment] {
                    if let Some(e) = LedgerService::find_by_reference(txn, t, domain_txn_id).await? {
                        original = Some(e);
                        break;
                    }
                }
                let Some(original) = original.filter(|e| e.status == EntryStatus::Completed) else {
                    log::warn!("No completed debit found for failed transaction {domain_txn_id}; nothing to refund");
                    return Ok(None);
                };
                if original.user_id != user_id {
                    return Err(AppError::ValidationError(format!(
                        "Transaction {domain_txn_id} belongs to another user"
                    )));
                }

                let delta = DeltaRequest::new(user_id, original.amount, EntryType::Refund)
                    .reference(domain_txn_id)
                    .metadata(EntryMetadata::Reversal {
                        domain_txn_id: domain_txn_id.to_string(),
                        original_entry_id: original.id,
                    })
                    .description(format!("Refund for failed {domain_txn_id}"));
                Ok(Some(WalletService::apply_delta_in(txn, &delta).await?))
            }
        }
    }

    /// 发放一张返现刮刮卡：PENDING 条目，领取前不影响余额
    pub async fn issue_cashback(&self, req: IssueCashbackRequest) -> AppResult<entries::Model> {
        if req.amount <= 0 {
            return Err(AppError::ValidationError(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if let Some(reference) = req.reference.as_deref()
            && let Some(existing) =
                LedgerService::find_by_reference(&self.pool, EntryType::Cashback, reference).await?
        {
            return Self::replayed_card(existing, req.user_id);
        }

        let txn = self.pool.begin().await?;
        let wallet = LedgerService::ensure_wallet(&txn, req.user_id).await?;
        let inserted = LedgerService::append_entry(
            &txn,
            NewEntry {
                user_id: req.user_id,
                wallet_id: wallet.id,
                entry_type: EntryType::Cashback,
                amount: req.amount,
                balance_after: None,
                status: EntryStatus::Pending,
                reference: req.reference.clone(),
                cashback_state: Some(CashbackState::Created),
                description: Some("Cashback scratch card".to_string()),
                metadata: Some(EntryMetadata::Cashback {
                    campaign: req.campaign,
                }),
            },
        )
        .await;

        match inserted {
            Ok(entry) => {
                txn.commit().await?;
                log::info!(
                    "Cashback card {} issued to user {} ({} paise)",
                    entry.id,
                    entry.user_id,
                    entry.amount
                );
                Ok(entry)
            }
            Err(AppError::DuplicateReference) => {
                txn.rollback().await?;
                let reference = req.reference.unwrap_or_default();
                let existing =
                    LedgerService::find_by_reference(&self.pool, EntryType::Cashback, &reference)
                        .await?
                        .ok_or(AppError::DuplicateReference)?;
                Self::replayed_card(existing, req.user_id)
            }
            Err(e) => Err(e),
        }
    }

    /// 同引用重放只对同一用户有效
    fn replayed_card(existing: entries::Model, user_id: i64) -> AppResult<entries::Model> {
        if existing.user_id != user_id {
            log::warn!(
                "Cashback reference {:?} already issued to user {}, not {}",
                existing.reference,
                existing.user_id,
                user_id
            );
            return Err(AppError::ValidationError(
                "Cashback reference already used by another user".to_string(),
            ));
        }
        Ok(existing)
    }

    /// CREATED -> REVEALED；已刮开的再次刮开直接返回
    pub async fn reveal(&self, entry_id: i64, user_id: i64) -> AppResult<entries::Model> {
        let result = entries::Entity::update_many()
            .col_expr(
                entries::Column::CashbackState,
                Expr::value(CashbackState::Revealed),
            )
            .filter(Self::own_card(entry_id, user_id))
            .filter(entries::Column::CashbackState.eq(CashbackState::Created))
            .exec(&self.pool)
            .await?;

        let card = self.find_card(entry_id, user_id).await?;
        if result.rows_affected == 0 && card.cashback_state != Some(CashbackState::Revealed) {
            return Err(Self::not_claimable(&card));
        }
        Ok(card)
    }

    /// 领取返现：状态 CAS 成功的那一次才入账
    pub async fn claim(&self, entry_id: i64, user_id: i64) -> AppResult<ClaimCashbackResponse> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let result = entries::Entity::update_many()
            .col_expr(entries::Column::Status, Expr::value(EntryStatus::Completed))
            .col_expr(
                entries::Column::CashbackState,
                Expr::value(CashbackState::Claimed),
            )
            .col_expr(entries::Column::ProcessedAt, Expr::value(now))
            .filter(Self::own_card(entry_id, user_id))
            .filter(entries::Column::Status.eq(EntryStatus::Pending))
            .filter(
                entries::Column::CashbackState
                    .is_in([CashbackState::Created, CashbackState::Revealed]),
            )
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            let card = entries::Entity::find_by_id(entry_id)
                .filter(entries::Column::UserId.eq(user_id))
                .filter(entries::Column::EntryType.eq(EntryType::Cashback))
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Cashback {entry_id} not found")))?;
            return Err(Self::not_claimable(&card));
        }

        let card = entries::Entity::find_by_id(entry_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cashback {entry_id} not found")))?;
        let wallet = LedgerService::adjust_balance(&txn, card.wallet_id, card.amount).await?;
        entries::Entity::update_many()
            .col_expr(entries::Column::BalanceAfter, Expr::value(wallet.balance))
            .filter(entries::Column::Id.eq(entry_id))
            .exec(&txn)
            .await?;
        let card = entries::Entity::find_by_id(entry_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cashback {entry_id} not found")))?;
        txn.commit().await?;

        log::info!(
            "Cashback {} claimed by user {}: +{} (balance {})",
            entry_id,
            user_id,
            card.amount,
            wallet.balance
        );
        Ok(ClaimCashbackResponse {
            entry: card.into(),
            new_balance: wallet.balance,
        })
    }

    /// 作废未领取的刮刮卡
    pub async fn void_cashback(&self, entry_id: i64) -> AppResult<entries::Model> {
        let result = entries::Entity::update_many()
            .col_expr(entries::Column::Status, Expr::value(EntryStatus::Failed))
            .col_expr(
                entries::Column::CashbackState,
                Expr::value(CashbackState::Voided),
            )
            .col_expr(entries::Column::ProcessedAt, Expr::value(Utc::now()))
            .filter(entries::Column::Id.eq(entry_id))
            .filter(entries::Column::EntryType.eq(EntryType::Cashback))
            .filter(entries::Column::Status.eq(EntryStatus::Pending))
            .exec(&self.pool)
            .await?;

        let card = entries::Entity::find_by_id(entry_id)
            .filter(entries::Column::EntryType.eq(EntryType::Cashback))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cashback {entry_id} not found")))?;
        if result.rows_affected == 0 && card.cashback_state != Some(CashbackState::Voided) {
            return Err(Self::not_claimable(&card));
        }
        Ok(card)
    }

    fn own_card(entry_id: i64, user_id: i64) -> sea_orm::Condition {
        sea_orm::Condition::all()
            .add(entries::Column::Id.eq(entry_id))
            .add(entries::Column::UserId.eq(user_id))
            .add(entries::Column::EntryType.eq(EntryType::Cashback))
    }

    async fn find_card(&self, entry_id: i64, user_id: i64) -> AppResult<entries::Model> {
        entries::Entity::find()
            .filter(Self::own_card(entry_id, user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cashback {entry_id} not found")))
    }

    fn not_claimable(card: &entries::Model) -> AppError {
        match card.cashback_state {
            Some(CashbackState::Claimed) => AppError::AlreadyClaimed,
            state => AppError::InvalidTransition(format!(
                "Cashback {} is {:?}",
                card.id, state
            )),
        }
    }
}
