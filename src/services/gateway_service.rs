use crate::config::WalletConfig;
use crate::entities::{EntryType, GatewayOrderStatus, SettledVia, gateway_order_entity as orders};
use crate::error::{AppError, AppResult};
use crate::external::{
    Notification, Notifier, PaymentGateway, ProviderOrderRequest, ProviderPaymentStatus,
};
use crate::models::{
    CreateOrderRequest, CreateOrderResponse, CustomerSnapshot, EntryMetadata, GatewayOrderResponse,
    MarkPaidRequest, ReturnPathConfirmation, Settlement, WebhookEvent, WebhookPaymentStatus,
};
use crate::services::wallet_service::{DeltaRequest, WalletService};
use crate::utils::verify_hex;
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;

pub const CURRENCY: &str = "INR";

/// 网关支付的结算；订单状态的 CAS（CREATED -> 终态）是唯一的入账闸门
#[derive(Clone)]
pub struct GatewayService {
    pool: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    key_secret: String,
    webhook_secret: String,
    limits: WalletConfig,
}

/// 已付款确认的来源数据
#[derive(Debug, Clone)]
struct PaidConfirmation {
    provider_payment_id: String,
    payment_method: Option<String>,
    via: SettledVia,
}

impl GatewayService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        key_secret: String,
        webhook_secret: String,
        limits: WalletConfig,
    ) -> Self {
        Self {
            pool,
            gateway,
            notifier,
            key_secret,
            webhook_secret,
            limits,
        }
    }

    /// 创建网关订单：先落库 CREATED，再在事务外调用网关
    pub async fn create_order(
        &self,
        user_id: i64,
        req: CreateOrderRequest,
    ) -> AppResult<CreateOrderResponse> {
        if req.amount < self.limits.min_topup || req.amount > self.limits.max_topup {
            return Err(AppError::ValidationError(format!(
                "Amount must be between {} and {} paise",
                self.limits.min_topup, self.limits.max_topup
            )));
        }

        let order_id = format!("ORD{}", uuid::Uuid::new_v4().simple());
        let snapshot = CustomerSnapshot {
            name: req.customer_name,
            email: req.customer_email,
            phone: req.customer_phone,
        };
        let now = Utc::now();
        let order = orders::ActiveModel {
            order_id: Set(order_id.clone()),
            user_id: Set(user_id),
            amount: Set(req.amount),
            currency: Set(CURRENCY.to_string()),
            status: Set(GatewayOrderStatus::Created),
            metadata: Set(Some(snapshot.to_json())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        let provider_req = ProviderOrderRequest {
            order_id: order_id.clone(),
            user_id,
            amount: order.amount,
            currency: order.currency.clone(),
            customer_email: snapshot.email,
            customer_phone: snapshot.phone,
        };
        let provider_order = match self.gateway.create_order(&provider_req).await {
            Ok(o) => o,
            Err(e) => {
                self.transition(&order_id, GatewayOrderStatus::Failed, None)
                    .await?;
                return Err(AppError::GatewayUnavailable(format!(
                    "create order {order_id}: {e}"
                )));
            }
        };

        orders::Entity::update_many()
            .col_expr(
                orders::Column::ProviderOrderId,
                Expr::value(provider_order.provider_order_id.clone()),
            )
            .col_expr(
                orders::Column::SessionToken,
                Expr::value(provider_order.session_token.clone()),
            )
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::OrderId.eq(order_id.as_str()))
            .exec(&self.pool)
            .await?;

        log::info!(
            "Gateway order {} created for user {} (provider {}, amount {})",
            order_id,
            user_id,
            provider_order.provider_order_id,
            order.amount
        );
        Ok(CreateOrderResponse {
            order_id,
            provider_order_id: provider_order.provider_order_id,
            session_token: provider_order.session_token,
            amount: order.amount,
            currency: order.currency,
        })
    }

    /// 支付页回跳确认：签名为 HMAC(key_secret, "provider_order_id|payment_id")
    pub async fn confirm_from_return_path(
        &self,
        user_id: i64,
        conf: ReturnPathConfirmation,
    ) -> AppResult<Settlement> {
        let order = self.find_order(&self.pool, &conf.order_id).await?;
        if order.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        let Some(provider_order_id) = order.provider_order_id.as_deref() else {
            return Err(AppError::InvalidTransition(format!(
                "Order {} has no provider order",
                order.order_id
            )));
        };

        let payload = format!("{}|{}", provider_order_id, conf.provider_payment_id);
        if let Err(e) = verify_hex(&self.key_secret, payload.as_bytes(), &conf.signature) {
            log::warn!(
                "Return-path signature mismatch for order {} (payment {})",
                order.order_id,
                conf.provider_payment_id
            );
            return Err(e);
        }

        self.settle_paid(
            &order.order_id,
            PaidConfirmation {
                provider_payment_id: conf.provider_payment_id,
                payment_method: None,
                via: SettledVia::ReturnPath,
            },
        )
        .await
    }

    /// 消费网关 webhook：先对原始请求体验签，再解析
    ///
    /// 未知订单返回 `Ok(None)`（应答 200 以停止网关重试）。
    pub async fn consume_webhook(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> AppResult<Option<Settlement>> {
        if let Err(e) = verify_hex(&self.webhook_secret, raw_body, signature) {
            log::warn!("Webhook signature mismatch ({} bytes)", raw_body.len());
            return Err(e);
        }

        let event: WebhookEvent = serde_json::from_slice(raw_body)
            .map_err(|e| AppError::ValidationError(format!("Malformed webhook event: {e}")))?;

        let Some(order) = self.resolve_event_order(&event).await? else {
            log::warn!(
                "Webhook {:?} refers to unknown order (order_id={:?}, provider_order_id={:?})",
                event.event_id,
                event.order_id,
                event.provider_order_id
            );
            return Ok(None);
        };

        let settlement = match event.status {
            WebhookPaymentStatus::Paid => {
                let Some(payment_id) = event.payment_id else {
                    return Err(AppError::ValidationError(
                        "Paid webhook without payment_id".to_string(),
                    ));
                };
                self.settle_paid(
                    &order.order_id,
                    PaidConfirmation {
                        provider_payment_id: payment_id,
                        payment_method: event.payment_method,
                        via: SettledVia::Webhook,
                    },
                )
                .await?
            }
            WebhookPaymentStatus::Failed => {
                self.mark_failed(&order.order_id, SettledVia::Webhook)
                    .await?
            }
        };
        Ok(Some(settlement))
    }

    async fn resolve_event_order(&self, event: &WebhookEvent) -> AppResult<Option<orders::Model>> {
        if let Some(order_id) = event.order_id.as_deref()
            && let Some(order) = orders::Entity::find()
                .filter(orders::Column::OrderId.eq(order_id))
                .one(&self.pool)
                .await?
        {
            return Ok(Some(order));
        }
        if let Some(provider_order_id) = event.provider_order_id.as_deref() {
            return Ok(orders::Entity::find()
                .filter(orders::Column::ProviderOrderId.eq(provider_order_id))
                .one(&self.pool)
                .await?);
        }
        Ok(None)
    }

    /// CREATED -> PAID 并入账，二者同一事务
    ///
    /// 订单已是终态时不做任何修改，返回当前状态（`applied = false`）。
    async fn settle_paid(&self, order_id: &str, conf: PaidConfirmation) -> AppResult<Settlement> {
        let txn = self.pool.begin().await?;

        let now = Utc::now();
        let mut cas = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(GatewayOrderStatus::Paid))
            .col_expr(
                orders::Column::ProviderPaymentId,
                Expr::value(conf.provider_payment_id.clone()),
            )
            .col_expr(orders::Column::SettledVia, Expr::value(conf.via))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::OrderId.eq(order_id))
            .filter(orders::Column::Status.eq(GatewayOrderStatus::Created));
        if let Some(method) = conf.payment_method.clone() {
            cas = cas.col_expr(orders::Column::PaymentMethod, Expr::value(method));
        }

        if cas.exec(&txn).await?.rows_affected == 0 {
            let order = self.find_order(&txn, order_id).await?;
            txn.commit().await?;
            match order.status {
                GatewayOrderStatus::Paid => log::info!(
                    "Order {} already PAID (via {:?}); {:?} confirmation ignored",
                    order_id,
                    order.settled_via,
                    conf.via
                ),
                status => log::error!(
                    "Payment {} confirmed via {:?} for order {} in state {:?}; manual review required",
                    conf.provider_payment_id,
                    conf.via,
                    order_id,
                    status
                ),
            }
            return Ok(Settlement {
                order: order.into(),
                applied: false,
                new_balance: None,
            });
        }

        let order = self.find_order(&txn, order_id).await?;
        let delta = DeltaRequest::new(order.user_id, order.amount, EntryType::Deposit)
            .reference(conf.provider_payment_id.clone())
            .metadata(EntryMetadata::Gateway {
                order_id: order.order_id.clone(),
                provider_order_id: order.provider_order_id.clone(),
                provider_payment_id: conf.provider_payment_id.clone(),
                payment_method: conf.payment_method.clone(),
                confirmed_via: conf.via,
            })
            .description(format!("Gateway payment for order {order_id}"));
        let entry = WalletService::apply_delta_in(&txn, &delta).await?;

        // 同一支付号已为其他订单入账：回滚 CAS，订单保持 CREATED
        let settled_order = entry
            .metadata
            .as_ref()
            .and_then(EntryMetadata::from_json)
            .and_then(|meta| match meta {
                EntryMetadata::Gateway { order_id, .. } => Some(order_id),
                _ => None,
            });
        if settled_order.as_deref() != Some(order_id) {
            txn.rollback().await?;
            log::error!(
                "Payment {} already settled entry {} for order {:?}; refusing to settle order {}",
                conf.provider_payment_id,
                entry.id,
                settled_order,
                order_id
            );
            return Err(AppError::ValidationError(format!(
                "Payment {} already settled for another order",
                conf.provider_payment_id
            )));
        }

        orders::Entity::update_many()
            .col_expr(orders::Column::EntryId, Expr::value(entry.id))
            .filter(orders::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        let order = self.find_order(&txn, order_id).await?;
        txn.commit().await?;

        log::info!(
            "Order {} settled via {:?}: +{} to user {} (entry {})",
            order_id,
            conf.via,
            order.amount,
            order.user_id,
            entry.id
        );
        self.notify_settled(&order);

        Ok(Settlement {
            order: order.into(),
            applied: true,
            new_balance: entry.balance_after,
        })
    }

    fn notify_settled(&self, order: &orders::Model) {
        let notifier = self.notifier.clone();
        let notification = Notification::GatewayPaymentSettled {
            user_id: order.user_id,
            order_id: order.order_id.clone(),
            amount: order.amount,
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&notification).await {
                log::warn!("Failed to notify gateway settlement: {e}");
            }
        });
    }

    async fn mark_failed(&self, order_id: &str, via: SettledVia) -> AppResult<Settlement> {
        let applied = self
            .transition(order_id, GatewayOrderStatus::Failed, Some(via))
            .await?;
        let order = self.find_order(&self.pool, order_id).await?;
        if !applied {
            log::info!(
                "Order {} is {:?}; failure notice via {:?} ignored",
                order_id,
                order.status,
                via
            );
        }
        Ok(Settlement {
            order: order.into(),
            applied,
            new_balance: None,
        })
    }

    /// CREATED -> 终态（FAILED / EXPIRED），无账本影响；返回是否发生了迁移
    async fn transition(
        &self,
        order_id: &str,
        to: GatewayOrderStatus,
        via: Option<SettledVia>,
    ) -> AppResult<bool> {
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(to))
            .col_expr(orders::Column::SettledVia, Expr::value(via))
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::OrderId.eq(order_id))
            .filter(orders::Column::Status.eq(GatewayOrderStatus::Created))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// 运维钩子：把一个未支付订单置为 EXPIRED
    pub async fn expire(&self, order_id: &str) -> AppResult<GatewayOrderResponse> {
        let order = self.find_order(&self.pool, order_id).await?;
        if !self
            .transition(order_id, GatewayOrderStatus::Expired, Some(SettledVia::ExpirySweep))
            .await?
        {
            return Err(AppError::InvalidTransition(format!(
                "Order {order_id} is already {:?}",
                order.status
            )));
        }
        log::info!("Order {order_id} expired");
        Ok(self.find_order(&self.pool, order_id).await?.into())
    }

    /// 向网关查询订单的支付情况；发现已付款则按 STATUS_POLL 结算
    pub async fn sync_order_status(&self, order_id: &str) -> AppResult<GatewayOrderResponse> {
        let order = self.find_order(&self.pool, order_id).await?;
        if order.status.is_terminal() {
            return Ok(order.into());
        }
        let Some(provider_order_id) = order.provider_order_id.as_deref() else {
            return Ok(order.into());
        };

        let status = self
            .gateway
            .fetch_payment_status(provider_order_id)
            .await
            .map_err(|e| AppError::GatewayUnavailable(format!("fetch order {order_id}: {e}")))?;

        match status {
            ProviderPaymentStatus::Paid {
                payment_id,
                payment_method,
            } => Ok(self
                .settle_paid(
                    order_id,
                    PaidConfirmation {
                        provider_payment_id: payment_id,
                        payment_method,
                        via: SettledVia::StatusPoll,
                    },
                )
                .await?
                .order),
            ProviderPaymentStatus::Failed => {
                Ok(self.mark_failed(order_id, SettledVia::StatusPoll).await?.order)
            }
            ProviderPaymentStatus::Pending => Ok(order.into()),
        }
    }

    /// 清扫超过有效期仍为 CREATED 的订单；先向网关确认一次，避免漏掉迟到的付款
    pub async fn expire_stale(&self, older_than: Duration) -> AppResult<u64> {
        let cutoff = Utc::now() - older_than;
        let stale: Vec<String> = orders::Entity::find()
            .select_only()
            .column(orders::Column::OrderId)
            .filter(orders::Column::Status.eq(GatewayOrderStatus::Created))
            .filter(orders::Column::CreatedAt.lt(cutoff))
            .order_by_asc(orders::Column::Id)
            .limit(500)
            .into_tuple()
            .all(&self.pool)
            .await?;

        let mut expired = 0;
        for order_id in stale {
            match self.sync_order_status(&order_id).await {
                Ok(order) if order.status.is_terminal() => continue,
                Ok(_) => {}
                Err(e) => {
                    // 网关不可达时不能确认未付款，留到下一轮
                    log::warn!("Status poll for stale order {order_id} failed: {e}");
                    continue;
                }
            }
            if self
                .transition(&order_id, GatewayOrderStatus::Expired, Some(SettledVia::ExpirySweep))
                .await?
            {
                expired += 1;
            }
        }
        if expired > 0 {
            log::info!("Expired {expired} stale gateway orders");
        }
        Ok(expired)
    }

    /// 人工补单：与其他确认路径共用同一个 CAS 闸门
    pub async fn admin_mark_paid(
        &self,
        order_id: &str,
        admin_id: i64,
        req: MarkPaidRequest,
    ) -> AppResult<Settlement> {
        if req.provider_payment_id.trim().is_empty() {
            return Err(AppError::ValidationError(
                "provider_payment_id is required".to_string(),
            ));
        }
        log::warn!(
            "Admin {} marking order {} paid with payment {}",
            admin_id,
            order_id,
            req.provider_payment_id
        );
        let settlement = self
            .settle_paid(
                order_id,
                PaidConfirmation {
                    provider_payment_id: req.provider_payment_id.trim().to_string(),
                    payment_method: req.payment_method,
                    via: SettledVia::Admin,
                },
            )
            .await?;
        if !settlement.applied {
            return Err(AppError::InvalidTransition(format!(
                "Order {order_id} is already {:?}",
                settlement.order.status
            )));
        }
        Ok(settlement)
    }

    /// 订单状态页；只能查看自己的订单
    pub async fn get_order(&self, order_id: &str, user_id: i64) -> AppResult<GatewayOrderResponse> {
        let order = self.find_order(&self.pool, order_id).await?;
        if order.user_id != user_id {
            return Err(AppError::NotFound(format!("Order {order_id} not found")));
        }
        Ok(order.into())
    }

    async fn find_order<C: ConnectionTrait>(&self, db: &C, order_id: &str) -> AppResult<orders::Model> {
        orders::Entity::find()
            .filter(orders::Column::OrderId.eq(order_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))
    }
}
