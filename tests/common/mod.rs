#![allow(dead_code)]

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use wallet_core::config::WalletConfig;
use wallet_core::database::run_migrations;
use wallet_core::entities::EntryType;
use wallet_core::error::{AppError, AppResult};
use wallet_core::external::{
    Notification, Notifier, PaymentGateway, ProviderOrder, ProviderOrderRequest,
    ProviderPaymentStatus, RechargeOutcome, RechargeProvider, RechargeSubmission,
};
use wallet_core::services::*;

pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";
pub const CALLBACK_SECRET: &str = "test_callback_secret";
pub const COMMISSION_BP: i64 = 200;

/// 内存 SQLite；单连接保证所有服务看到同一个库
pub async fn setup_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to open in-memory database");
    run_migrations(&db).await.expect("Failed to run migrations");
    db
}

/// 可控的支付网关替身
#[derive(Default)]
pub struct FakeGateway {
    pub fail_create: AtomicBool,
    pub fail_poll: AtomicBool,
    pub status: Mutex<Option<ProviderPaymentStatus>>,
}

impl FakeGateway {
    pub fn set_status(&self, status: ProviderPaymentStatus) {
        *self.status.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, req: &ProviderOrderRequest) -> AppResult<ProviderOrder> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::ExternalApiError("connection refused".to_string()));
        }
        Ok(ProviderOrder {
            provider_order_id: format!("order_{}", req.order_id),
            session_token: "rzp_test_key".to_string(),
        })
    }

    async fn fetch_payment_status(&self, _provider_order_id: &str) -> AppResult<ProviderPaymentStatus> {
        if self.fail_poll.load(Ordering::SeqCst) {
            return Err(AppError::ExternalApiError("timeout".to_string()));
        }
        Ok(self
            .status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(ProviderPaymentStatus::Pending))
    }
}

/// 充值渠道替身：按预设结果应答
pub struct FakeRechargeProvider {
    pub outcome: Mutex<AppResult<RechargeOutcome>>,
}

impl FakeRechargeProvider {
    pub fn answering(outcome: RechargeOutcome) -> Self {
        Self {
            outcome: Mutex::new(Ok(outcome)),
        }
    }

    pub fn set(&self, outcome: AppResult<RechargeOutcome>) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

#[async_trait]
impl RechargeProvider for FakeRechargeProvider {
    async fn submit(&self, _req: &RechargeSubmission) -> AppResult<RechargeOutcome> {
        match &*self.outcome.lock().unwrap() {
            Ok(outcome) => Ok(outcome.clone()),
            Err(e) => Err(AppError::ExternalApiError(e.to_string())),
        }
    }
}

/// 记录全部通知；fail 为 true 时模拟投递失败
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: AtomicBool,
    /// 模拟无响应的通知渠道
    pub hang: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> AppResult<()> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ExternalApiError("smtp down".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub gateway: Arc<FakeGateway>,
    pub recharge_provider: Arc<FakeRechargeProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub ledger: LedgerService,
    pub wallets: WalletService,
    pub requests: WalletRequestService,
    pub orders: GatewayService,
    pub commissions: CommissionService,
    pub penalties: PenaltyService,
    pub recharges: RechargeService,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = setup_db().await;
        let limits = WalletConfig::default();
        let gateway = Arc::new(FakeGateway::default());
        let recharge_provider = Arc::new(FakeRechargeProvider::answering(RechargeOutcome::Pending));
        let notifier = Arc::new(RecordingNotifier::default());

        Self {
            ledger: LedgerService::new(db.clone()),
            wallets: WalletService::new(db.clone()),
            requests: WalletRequestService::new(db.clone(), limits.clone(), notifier.clone()),
            orders: GatewayService::new(
                db.clone(),
                gateway.clone(),
                notifier.clone(),
                KEY_SECRET.to_string(),
                WEBHOOK_SECRET.to_string(),
                limits.clone(),
            ),
            commissions: CommissionService::new(db.clone()),
            penalties: PenaltyService::new(db.clone(), notifier.clone()),
            recharges: RechargeService::new(
                db.clone(),
                recharge_provider.clone(),
                WalletConfig {
                    recharge_commission_bp: COMMISSION_BP,
                    ..limits
                },
                CALLBACK_SECRET.to_string(),
            ),
            db,
            gateway,
            recharge_provider,
            notifier,
        }
    }

    /// 以唯一引用给用户入账
    pub async fn fund(&self, user_id: i64, amount: i64) {
        let reference = format!("seed:{user_id}:{}", uuid::Uuid::new_v4());
        self.wallets
            .apply_delta(DeltaRequest::new(user_id, amount, EntryType::Deposit).reference(reference))
            .await
            .expect("Failed to fund wallet");
    }

    pub async fn balance(&self, user_id: i64) -> i64 {
        self.ledger
            .get_balance(user_id)
            .await
            .expect("Failed to read balance")
    }

    pub async fn assert_reconciled(&self, user_id: i64) {
        let rec = self.ledger.reconcile(user_id).await.expect("reconcile");
        assert!(
            rec.is_consistent(),
            "stored {} != computed {}",
            rec.stored_balance,
            rec.computed_balance
        );
    }
}
