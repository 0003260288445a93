use crate::entities::{EntryStatus, EntryType, transaction_entry_entity as entries};
use crate::error::{AppError, AppResult};
use crate::models::{EntryMetadata, WalletResponse};
use crate::services::ledger_service::{LedgerService, NewEntry};
use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait};

/// 一次余额变动请求；amount 恒为正，方向由 entry_type 决定
#[derive(Debug, Clone)]
pub struct DeltaRequest {
    pub user_id: i64,
    pub amount: i64,
    pub entry_type: EntryType,
    pub reference: Option<String>,
    pub metadata: Option<EntryMetadata>,
    pub description: Option<String>,
}

impl DeltaRequest {
    pub fn new(user_id: i64, amount: i64, entry_type: EntryType) -> Self {
        Self {
            user_id,
            amount,
            entry_type,
            reference: None,
            metadata: None,
            description: None,
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn validate(&self) -> AppResult<()> {
        if self.amount <= 0 {
            return Err(AppError::ValidationError(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if self.reference.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(AppError::ValidationError(
                "Reference must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct WalletService {
    pool: DatabaseConnection,
    ledger: LedgerService,
}

impl WalletService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self {
            ledger: LedgerService::new(pool.clone()),
            pool,
        }
    }

    pub async fn get_wallet(&self, user_id: i64) -> AppResult<WalletResponse> {
        Ok(self
            .ledger
            .get_wallet(user_id)
            .await?
            .map(WalletResponse::from)
            .unwrap_or_else(|| WalletResponse::empty(user_id)))
    }

    /// 在独立事务中应用一次余额变动
    ///
    /// 同一引用的重放（包括并发重放中落败的一方）返回已存在的条目，不会重复记账。
    pub async fn apply_delta(&self, req: DeltaRequest) -> AppResult<entries::Model> {
        req.validate()?;
        if let Some(existing) = Self::find_replay(&self.pool, &req).await? {
            return Ok(existing);
        }

        let txn = self.pool.begin().await?;
        let applied = Self::apply_delta_in(&txn, &req).await;
        self.finish_delta(txn, &req, applied).await
    }

    /// 提交或回滚 `apply_delta` 的事务
    ///
    /// 唯一索引冲突说明同引用的并发请求已先提交：回滚本事务并返回胜出者的条目。
    async fn finish_delta(
        &self,
        txn: DatabaseTransaction,
        req: &DeltaRequest,
        applied: AppResult<entries::Model>,
    ) -> AppResult<entries::Model> {
        match applied {
            Ok(entry) => {
                txn.commit().await?;
                log::info!(
                    "Applied {} of {} to user {} (entry {}, balance {:?})",
                    entry.entry_type,
                    entry.amount,
                    entry.user_id,
                    entry.id,
                    entry.balance_after
                );
                Ok(entry)
            }
            Err(AppError::DuplicateReference) => {
                txn.rollback().await?;
                log::info!(
                    "Lost race on {} reference {:?}; returning committed entry",
                    req.entry_type,
                    req.reference
                );
                Self::find_replay(&self.pool, req)
                    .await?
                    .ok_or(AppError::DuplicateReference)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    /// 在调用方的事务内应用余额变动：确保钱包、原子调整余额、追加条目
    ///
    /// 出错时调用方必须放弃整个事务。
    pub async fn apply_delta_in(
        txn: &DatabaseTransaction,
        req: &DeltaRequest,
    ) -> AppResult<entries::Model> {
        req.validate()?;
        if let Some(existing) = Self::find_replay(txn, req).await? {
            return Ok(existing);
        }

        let wallet = LedgerService::ensure_wallet(txn, req.user_id).await?;
        let wallet =
            LedgerService::adjust_balance(txn, wallet.id, req.entry_type.signed(req.amount))
                .await?;

        LedgerService::append_entry(
            txn,
            NewEntry {
                user_id: req.user_id,
                wallet_id: wallet.id,
                entry_type: req.entry_type,
                amount: req.amount,
                balance_after: Some(wallet.balance),
                status: EntryStatus::Completed,
                reference: req.reference.clone(),
                cashback_state: None,
                description: req.description.clone(),
                metadata: req.metadata.clone(),
            },
        )
        .await
    }

    /// 查找同 (类型, 引用) 的已终结条目
    async fn find_replay<C: ConnectionTrait>(
        db: &C,
        req: &DeltaRequest,
    ) -> AppResult<Option<entries::Model>> {
        let Some(reference) = req.reference.as_deref() else {
            return Ok(None);
        };
        let Some(existing) = LedgerService::find_by_reference(db, req.entry_type, reference).await?
        else {
            return Ok(None);
        };

        if !existing.status.is_terminal() {
            return Err(AppError::DuplicateReference);
        }
        if existing.user_id != req.user_id || existing.amount != req.amount {
            log::warn!(
                "Replay of {} reference {} differs from stored entry {} (user {} vs {}, amount {} vs {})",
                req.entry_type,
                reference,
                existing.id,
                req.user_id,
                existing.user_id,
                req.amount,
                existing.amount
            );
        }
        Ok(Some(existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, Database};

    async fn sqlite_service() -> WalletService {
        let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
        opts.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        crate::database::run_migrations(&db).await.unwrap();
        WalletService::new(db)
    }

    fn entry_for(req: &DeltaRequest, wallet_id: i64, balance_after: i64) -> NewEntry {
        NewEntry {
            user_id: req.user_id,
            wallet_id,
            entry_type: req.entry_type,
            amount: req.amount,
            balance_after: Some(balance_after),
            status: EntryStatus::Completed,
            reference: req.reference.clone(),
            cashback_state: None,
            description: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_lost_race_rolls_back_and_returns_winner() {
        let service = sqlite_service().await;
        let req = DeltaRequest::new(5, 2_500, EntryType::Deposit).reference("pay_race");
        let winner = service.apply_delta(req.clone()).await.unwrap();

        // 落败方已越过重放检查：余额先被调整，随后插入撞上 (类型, 引用) 唯一索引
        let txn = service.pool.begin().await.unwrap();
        let wallet = LedgerService::ensure_wallet(&txn, 5).await.unwrap();
        let wallet = LedgerService::adjust_balance(&txn, wallet.id, req.amount)
            .await
            .unwrap();
        assert_eq!(wallet.balance, 5_000);
        let applied =
            LedgerService::append_entry(&txn, entry_for(&req, wallet.id, wallet.balance)).await;
        assert!(matches!(applied, Err(AppError::DuplicateReference)));

        let entry = service.finish_delta(txn, &req, applied).await.unwrap();
        assert_eq!(entry.id, winner.id);
        assert_eq!(service.get_wallet(5).await.unwrap().balance, 2_500);
        let recon = service.ledger.reconcile(5).await.unwrap();
        assert_eq!(recon.stored_balance, recon.computed_balance);
    }

    #[tokio::test]
    async fn test_debit_checks_balance_at_update_time() {
        let service = sqlite_service().await;
        service
            .apply_delta(DeltaRequest::new(6, 1_000, EntryType::Deposit).reference("seed:6"))
            .await
            .unwrap();

        let txn = service.pool.begin().await.unwrap();
        let snapshot = LedgerService::ensure_wallet(&txn, 6).await.unwrap();
        LedgerService::adjust_balance(&txn, snapshot.id, -800)
            .await
            .unwrap();
        // 过期快照仍显示足额，条件 UPDATE 依据当前余额拒绝
        assert!(snapshot.balance >= 800);
        let err = LedgerService::adjust_balance(&txn, snapshot.id, -800)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance));
        txn.commit().await.unwrap();

        assert_eq!(service.get_wallet(6).await.unwrap().balance, 200);
    }

    #[test]
    fn test_delta_request_validation() {
        assert!(DeltaRequest::new(1, 0, EntryType::Deposit).validate().is_err());
        assert!(DeltaRequest::new(1, -5, EntryType::Deposit).validate().is_err());
        assert!(
            DeltaRequest::new(1, 5, EntryType::Deposit)
                .reference("  ")
                .validate()
                .is_err()
        );
        assert!(
            DeltaRequest::new(1, 5, EntryType::Withdrawal)
                .reference("wr:1")
                .validate()
                .is_ok()
        );
    }
}
