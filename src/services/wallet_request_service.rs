use crate::config::WalletConfig;
use crate::entities::{
    EntryType, WalletRequestStatus, WalletRequestType, wallet_request_entity as requests,
};
use crate::error::{AppError, AppResult};
use crate::external::{Notification, Notifier};
use crate::models::{
    DecideWalletRequest, Decision, EntryMetadata, PaginatedResponse, PaginationParams,
    SubmitWalletRequest, WalletRequestQuery, WalletRequestResponse,
};
use crate::services::ledger_service::LedgerService;
use crate::services::wallet_service::{DeltaRequest, WalletService};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;

/// 充值 / 提现申请的审批流程
#[derive(Clone)]
pub struct WalletRequestService {
    pool: DatabaseConnection,
    ledger: LedgerService,
    limits: WalletConfig,
    notifier: Arc<dyn Notifier>,
}

impl WalletRequestService {
    pub fn new(pool: DatabaseConnection, limits: WalletConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            ledger: LedgerService::new(pool.clone()),
            pool,
            limits,
            notifier,
        }
    }

    fn check_bounds(&self, request_type: WalletRequestType, amount: i64) -> AppResult<()> {
        let (min, max) = match request_type {
            WalletRequestType::Topup => (self.limits.min_topup, self.limits.max_topup),
            WalletRequestType::Withdrawal => (self.limits.min_withdrawal, self.limits.max_withdrawal),
        };
        if amount < min || amount > max {
            return Err(AppError::ValidationError(format!(
                "Amount must be between {min} and {max} paise"
            )));
        }
        Ok(())
    }

    pub async fn submit(
        &self,
        user_id: i64,
        req: SubmitWalletRequest,
    ) -> AppResult<WalletRequestResponse> {
        self.check_bounds(req.request_type, req.amount)?;

        match req.request_type {
            WalletRequestType::Withdrawal => {
                // 提前提示；最终以审批时的原子扣减为准
                if self.ledger.get_balance(user_id).await? < req.amount {
                    return Err(AppError::InsufficientBalance);
                }
            }
            WalletRequestType::Topup => {
                if let Some(utr) = req.transaction_reference.as_deref() {
                    self.ensure_unused_utr(utr).await?;
                }
            }
        }

        let model = requests::ActiveModel {
            user_id: Set(user_id),
            request_type: Set(req.request_type),
            amount: Set(req.amount),
            status: Set(WalletRequestStatus::Pending),
            payment_method: Set(req.payment_method),
            transaction_reference: Set(req
                .transaction_reference
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())),
            evidence_url: Set(req.evidence_url),
            remarks: Set(req.remarks),
            metadata: Set(req.metadata),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Wallet request {} submitted: user={} type={:?} amount={}",
            model.id,
            user_id,
            model.request_type,
            model.amount
        );
        Ok(model.into())
    }

    /// 同一 UTR 不能重复用于待审或已通过的充值申请
    async fn ensure_unused_utr(&self, utr: &str) -> AppResult<()> {
        let utr = utr.trim();
        if utr.is_empty() {
            return Ok(());
        }
        let used = requests::Entity::find()
            .filter(requests::Column::RequestType.eq(WalletRequestType::Topup))
            .filter(requests::Column::TransactionReference.eq(utr))
            .filter(
                requests::Column::Status
                    .is_in([WalletRequestStatus::Pending, WalletRequestStatus::Approved]),
            )
            .count(&self.pool)
            .await?;
        if used > 0 {
            return Err(AppError::ValidationError(
                "This transaction reference has already been submitted".to_string(),
            ));
        }
        Ok(())
    }

    /// 审批：状态 CAS 与账本变动在同一事务中提交
    ///
    /// 审批通过但余额不足时整个事务回滚，申请保持 PENDING。
    pub async fn decide(
        &self,
        request_id: i64,
        approver_id: i64,
        decision: DecideWalletRequest,
    ) -> AppResult<WalletRequestResponse> {
        let target: WalletRequestStatus = decision.outcome.into();
        let txn = self.pool.begin().await?;

        let request = requests::Entity::find_by_id(request_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet request {request_id} not found")))?;
        if request.status != WalletRequestStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Wallet request {request_id} is already {}",
                request.status
            )));
        }

        let now = Utc::now();
        let mut update = requests::Entity::update_many()
            .col_expr(requests::Column::Status, Expr::value(target))
            .col_expr(requests::Column::ApproverId, Expr::value(approver_id))
            .col_expr(requests::Column::DecidedAt, Expr::value(now))
            .filter(requests::Column::Id.eq(request_id))
            .filter(requests::Column::Status.eq(WalletRequestStatus::Pending));
        if let Some(remarks) = decision.remarks.clone() {
            update = update.col_expr(requests::Column::Remarks, Expr::value(remarks));
        }
        if update.exec(&txn).await?.rows_affected == 0 {
            return Err(AppError::InvalidTransition(format!(
                "Wallet request {request_id} was decided concurrently"
            )));
        }

        if decision.outcome == Decision::Approved {
            let entry_type = match request.request_type {
                WalletRequestType::Topup => EntryType::Deposit,
                WalletRequestType::Withdrawal => EntryType::Withdrawal,
            };
            let delta = DeltaRequest::new(request.user_id, request.amount, entry_type)
                .reference(format!("wallet_request:{request_id}"))
                .metadata(EntryMetadata::WalletRequest {
                    request_id,
                    approver_id,
                })
                .description(format!("Wallet request #{request_id} approved"));
            // 出错时事务随 txn 一起丢弃，申请保持 PENDING
            let entry = WalletService::apply_delta_in(&txn, &delta).await?;

            requests::Entity::update_many()
                .col_expr(requests::Column::EntryId, Expr::value(entry.id))
                .filter(requests::Column::Id.eq(request_id))
                .exec(&txn)
                .await?;
        }

        let updated = requests::Entity::find_by_id(request_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet request {request_id} not found")))?;
        txn.commit().await?;

        log::info!(
            "Wallet request {} {} by {}",
            request_id,
            updated.status,
            approver_id
        );
        self.notify_decided(&updated);
        Ok(updated.into())
    }

    fn notify_decided(&self, request: &requests::Model) {
        let notifier = self.notifier.clone();
        let notification = Notification::WalletRequestDecided {
            user_id: request.user_id,
            request_id: request.id,
            status: request.status,
            amount: request.amount,
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&notification).await {
                log::warn!("Failed to notify wallet request decision: {e}");
            }
        });
    }

    pub async fn get(&self, request_id: i64) -> AppResult<WalletRequestResponse> {
        requests::Entity::find_by_id(request_id)
            .one(&self.pool)
            .await?
            .map(WalletRequestResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("Wallet request {request_id} not found")))
    }

    pub async fn list(
        &self,
        query: &WalletRequestQuery,
    ) -> AppResult<PaginatedResponse<WalletRequestResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query = requests::Entity::find();
        if let Some(status) = query.status {
            base_query = base_query.filter(requests::Column::Status.eq(status));
        }
        if let Some(t) = query.request_type {
            base_query = base_query.filter(requests::Column::RequestType.eq(t));
        }
        if let Some(user_id) = query.user_id {
            base_query = base_query.filter(requests::Column::UserId.eq(user_id));
        }

        let total = base_query.clone().count(&self.pool).await? as i64;
        let items = base_query
            .order_by_desc(requests::Column::CreatedAt)
            .order_by_desc(requests::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(WalletRequestResponse::from)
            .collect();

        Ok(PaginatedResponse::from_params(items, &params, total))
    }
}
