use crate::entities::{EntryType, penalty_entity as penalties};
use crate::error::{AppError, AppResult};
use crate::external::{Notification, Notifier};
use crate::models::{ApplyPenaltyRequest, EntryMetadata, PenaltyResponse};
use crate::services::wallet_service::{DeltaRequest, WalletService};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use std::time::Duration;

/// 通知渠道无响应时不阻塞管理员请求
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// 处罚扣款：余额不足直接拒绝，余额永不为负
#[derive(Clone)]
pub struct PenaltyService {
    pool: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

impl PenaltyService {
    pub fn new(pool: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            notifier,
            notify_timeout: NOTIFY_TIMEOUT,
        }
    }

    pub fn with_notify_timeout(mut self, notify_timeout: Duration) -> Self {
        self.notify_timeout = notify_timeout;
        self
    }

    pub async fn apply(&self, applied_by: i64, req: ApplyPenaltyRequest) -> AppResult<PenaltyResponse> {
        if req.amount <= 0 {
            return Err(AppError::ValidationError(
                "Penalty amount must be greater than zero".to_string(),
            ));
        }
        if req.reason.trim().is_empty() {
            return Err(AppError::ValidationError("Penalty reason is required".to_string()));
        }

        let txn = self.pool.begin().await?;
        let penalty = penalties::ActiveModel {
            user_id: Set(req.user_id),
            amount: Set(req.amount),
            reason: Set(req.reason.clone()),
            penalty_type: Set(req.penalty_type.clone()),
            applied_by: Set(applied_by),
            email_sent: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let delta = DeltaRequest::new(req.user_id, req.amount, EntryType::Penalty)
            .reference(format!("penalty:{}", penalty.id))
            .metadata(EntryMetadata::Penalty {
                reason: req.reason.clone(),
                penalty_type: req.penalty_type.clone(),
                applied_by,
            })
            .description(format!("Penalty: {}", req.reason));
        // 余额不足时事务整体回滚，处罚记录也不会留下
        let entry = WalletService::apply_delta_in(&txn, &delta).await?;

        penalties::Entity::update_many()
            .col_expr(penalties::Column::EntryId, Expr::value(entry.id))
            .filter(penalties::Column::Id.eq(penalty.id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        log::info!(
            "Penalty {} applied to user {} by {}: -{} (balance {:?})",
            penalty.id,
            req.user_id,
            applied_by,
            req.amount,
            entry.balance_after
        );

        // 提交后的通知失败只记录日志
        let notification = Notification::PenaltyApplied {
            user_id: req.user_id,
            penalty_id: penalty.id,
            amount: req.amount,
            reason: req.reason,
            new_balance: entry.balance_after.unwrap_or_default(),
        };
        let sent = tokio::time::timeout(self.notify_timeout, self.notifier.notify(&notification)).await;
        let email_sent = match sent {
            Ok(Ok(())) => {
                if let Err(e) = penalties::Entity::update_many()
                    .col_expr(penalties::Column::EmailSent, Expr::value(true))
                    .filter(penalties::Column::Id.eq(penalty.id))
                    .exec(&self.pool)
                    .await
                {
                    log::warn!("Failed to flag penalty {} as notified: {e}", penalty.id);
                    false
                } else {
                    true
                }
            }
            Ok(Err(e)) => {
                log::warn!("Failed to notify penalty {}: {e}", penalty.id);
                false
            }
            Err(_) => {
                log::warn!(
                    "Notifying penalty {} timed out after {:?}",
                    penalty.id,
                    self.notify_timeout
                );
                false
            }
        };

        Ok(PenaltyResponse {
            entry_id: Some(entry.id),
            email_sent,
            ..penalty.into()
        })
    }
}
