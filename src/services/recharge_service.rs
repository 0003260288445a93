use crate::config::WalletConfig;
use crate::entities::{EntryType, RechargeStatus, recharge_entity as recharges};
use crate::error::{AppError, AppResult};
use crate::external::{RechargeOutcome, RechargeProvider, RechargeSubmission};
use crate::models::{EntryMetadata, RechargeCallback, RechargeResponse, StartRechargeRequest};
use crate::services::commission_service::{CommissionService, TransactionOutcome};
use crate::services::wallet_service::{DeltaRequest, WalletService};
use crate::utils::verify_hex;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use std::sync::Arc;

/// 10 位印度手机号，首位 6-9
fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == 10
        && mobile.chars().all(|c| c.is_ascii_digit())
        && matches!(mobile.as_bytes()[0], b'6'..=b'9')
}

/// 佣金按基点计算，向下取整；经 i128 计算避免溢出
pub fn commission_for(amount: i64, bp: i64) -> i64 {
    let commission = i128::from(amount) * i128::from(bp) / 10_000;
    i64::try_from(commission).unwrap_or(if commission < 0 { i64::MIN } else { i64::MAX })
}

/// 手机充值：先扣款再调用渠道，终态由渠道应答或回调驱动
#[derive(Clone)]
pub struct RechargeService {
    pool: DatabaseConnection,
    provider: Arc<dyn RechargeProvider>,
    limits: WalletConfig,
    callback_secret: String,
}

impl RechargeService {
    pub fn new(
        pool: DatabaseConnection,
        provider: Arc<dyn RechargeProvider>,
        limits: WalletConfig,
        callback_secret: String,
    ) -> Self {
        Self {
            pool,
            provider,
            limits,
            callback_secret,
        }
    }

    pub async fn start(&self, user_id: i64, req: StartRechargeRequest) -> AppResult<RechargeResponse> {
        let mobile = req.mobile.trim().to_string();
        if !is_valid_mobile(&mobile) {
            return Err(AppError::ValidationError("Invalid mobile number".to_string()));
        }
        if req.operator.trim().is_empty() {
            return Err(AppError::ValidationError("Operator is required".to_string()));
        }
        if req.amount < self.limits.min_recharge || req.amount > self.limits.max_recharge {
            return Err(AppError::ValidationError(format!(
                "Recharge amount must be between {} and {} paise",
                self.limits.min_recharge, self.limits.max_recharge
            )));
        }

        let recharge_id = format!("RCH{}", uuid::Uuid::new_v4().simple()).to_uppercase();
        let now = Utc::now();

        let txn = self.pool.begin().await?;
        recharges::ActiveModel {
            recharge_id: Set(recharge_id.clone()),
            user_id: Set(user_id),
            operator: Set(req.operator.trim().to_string()),
            mobile: Set(mobile.clone()),
            amount: Set(req.amount),
            commission: Set(commission_for(req.amount, self.limits.recharge_commission_bp)),
            status: Set(RechargeStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let delta = DeltaRequest::new(user_id, req.amount, EntryType::Recharge)
            .reference(recharge_id.clone())
            .metadata(EntryMetadata::Recharge {
                recharge_id: recharge_id.clone(),
                operator: req.operator.trim().to_string(),
                mobile: mobile.clone(),
            })
            .description(format!("Mobile recharge {mobile}"));
        WalletService::apply_delta_in(&txn, &delta).await?;
        txn.commit().await?;

        log::info!(
            "Recharge {} started: user={} mobile={} amount={}",
            recharge_id,
            user_id,
            mobile,
            req.amount
        );

        let submission = RechargeSubmission {
            recharge_id: recharge_id.clone(),
            operator: req.operator.trim().to_string(),
            mobile,
            amount: req.amount,
        };
        match self.provider.submit(&submission).await {
            Ok(RechargeOutcome::Success { provider_ref }) => {
                self.complete(&recharge_id, TransactionOutcome::Success, provider_ref)
                    .await
            }
            Ok(RechargeOutcome::Failed { provider_ref }) => {
                self.complete(&recharge_id, TransactionOutcome::Failure, provider_ref)
                    .await
            }
            Ok(RechargeOutcome::Pending) => self.get(&self.pool, &recharge_id).await,
            Err(e) => {
                // 结果未知，保持 PENDING 等待渠道回调
                log::warn!("Recharge {recharge_id} submission error, awaiting callback: {e}");
                self.get(&self.pool, &recharge_id).await
            }
        }
    }

    /// PENDING -> SUCCESS / FAILED，并在同一事务内发放佣金或退款
    pub async fn complete(
        &self,
        recharge_id: &str,
        outcome: TransactionOutcome,
        provider_ref: Option<String>,
    ) -> AppResult<RechargeResponse> {
        let target = match outcome {
            TransactionOutcome::Success => RechargeStatus::Success,
            TransactionOutcome::Failure => RechargeStatus::Failed,
        };

        let txn = self.pool.begin().await?;
        let mut cas = recharges::Entity::update_many()
            .col_expr(recharges::Column::Status, Expr::value(target))
            .col_expr(recharges::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(recharges::Column::RechargeId.eq(recharge_id))
            .filter(recharges::Column::Status.eq(RechargeStatus::Pending));
        if let Some(r) = provider_ref {
            cas = cas.col_expr(recharges::Column::ProviderRef, Expr::value(r));
        }

        if cas.exec(&txn).await?.rows_affected == 0 {
            let current = self.get(&txn, recharge_id).await?;
            txn.commit().await?;
            if current.status != target {
                log::error!(
                    "Recharge {} reported {:?} but is already {:?}; manual review required",
                    recharge_id,
                    target,
                    current.status
                );
            }
            return Ok(current);
        }
        let recharge = recharges::Entity::find()
            .filter(recharges::Column::RechargeId.eq(recharge_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recharge {recharge_id} not found")))?;

        CommissionService::apply_outcome_in(
            &txn,
            recharge_id,
            outcome,
            recharge.commission,
            recharge.user_id,
        )
        .await?;
        txn.commit().await?;

        log::info!("Recharge {recharge_id} completed as {target:?}");
        Ok(recharge.into())
    }

    /// 渠道回调：签名为 HMAC(callback_secret, "recharge_id|status|provider_ref")
    pub async fn handle_callback(&self, cb: RechargeCallback) -> AppResult<RechargeResponse> {
        let payload = format!(
            "{}|{}|{}",
            cb.recharge_id,
            cb.status,
            cb.provider_ref.as_deref().unwrap_or_default()
        );
        if let Err(e) = verify_hex(&self.callback_secret, payload.as_bytes(), &cb.signature) {
            log::warn!("Recharge callback signature mismatch for {}", cb.recharge_id);
            return Err(e);
        }

        match cb.status.to_ascii_uppercase().as_str() {
            "SUCCESS" => {
                self.complete(&cb.recharge_id, TransactionOutcome::Success, cb.provider_ref)
                    .await
            }
            "FAILED" | "FAILURE" => {
                self.complete(&cb.recharge_id, TransactionOutcome::Failure, cb.provider_ref)
                    .await
            }
            "PENDING" => self.get(&self.pool, &cb.recharge_id).await,
            other => Err(AppError::ValidationError(format!(
                "Unknown recharge status: {other}"
            ))),
        }
    }

    async fn get<C: ConnectionTrait>(&self, db: &C, recharge_id: &str) -> AppResult<RechargeResponse> {
        recharges::Entity::find()
            .filter(recharges::Column::RechargeId.eq(recharge_id))
            .one(db)
            .await?
            .map(RechargeResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("Recharge {recharge_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_validation() {
        assert!(is_valid_mobile("9876543210"));
        assert!(!is_valid_mobile("1234567890"));
        assert!(!is_valid_mobile("98765"));
        assert!(!is_valid_mobile("98765abcde"));
    }

    #[test]
    fn test_commission_rounds_down() {
        assert_eq!(commission_for(199_00, 200), 398);
        assert_eq!(commission_for(99, 200), 1);
        assert_eq!(commission_for(10_000, 0), 0);
    }

    #[test]
    fn test_commission_does_not_overflow() {
        assert_eq!(commission_for(i64::MAX / 100, 200), i64::MAX / 100 / 50);
        assert_eq!(commission_for(i64::MAX, 10_000), i64::MAX);
    }
}
