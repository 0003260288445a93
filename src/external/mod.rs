pub mod kwikapi;
pub mod notifier;
pub mod razorpay;

pub use kwikapi::KwikApiClient;
pub use notifier::{LogNotifier, Notification, Notifier};
pub use razorpay::RazorpayClient;

use crate::error::AppResult;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ProviderOrderRequest {
    pub order_id: String,
    pub user_id: i64,
    pub amount: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOrder {
    pub provider_order_id: String,
    pub session_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPaymentStatus {
    Paid {
        payment_id: String,
        payment_method: Option<String>,
    },
    Failed,
    Pending,
}

/// 支付网关出站接口
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, req: &ProviderOrderRequest) -> AppResult<ProviderOrder>;
    async fn fetch_payment_status(&self, provider_order_id: &str) -> AppResult<ProviderPaymentStatus>;
}

#[derive(Debug, Clone)]
pub struct RechargeSubmission {
    pub recharge_id: String,
    pub operator: String,
    pub mobile: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RechargeOutcome {
    Success { provider_ref: Option<String> },
    Failed { provider_ref: Option<String> },
    Pending,
}

/// 手机充值渠道出站接口
#[async_trait]
pub trait RechargeProvider: Send + Sync {
    async fn submit(&self, req: &RechargeSubmission) -> AppResult<RechargeOutcome>;
}
