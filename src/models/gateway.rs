use crate::entities::{GatewayOrderStatus, SettledVia, gateway_order_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// 金额（paise）
    pub amount: i64,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub provider_order_id: String,
    pub session_token: String,
    pub amount: i64,
    pub currency: String,
}

/// 用户支付完成后从支付页回跳时携带的数据
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnPathConfirmation {
    pub order_id: String,
    pub provider_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookPaymentStatus {
    Paid,
    Failed,
}

/// 网关推送的 webhook 事件（验签之后解析）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookEvent {
    pub event_id: Option<String>,
    pub order_id: Option<String>,
    pub provider_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub status: WebhookPaymentStatus,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Settlement {
    pub order: GatewayOrderResponse,
    /// 本次调用是否执行了入账；false 表示订单此前已进入终态（幂等空操作）
    pub applied: bool,
    pub new_balance: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayOrderResponse {
    pub order_id: String,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: GatewayOrderStatus,
    pub payment_method: Option<String>,
    pub settled_via: Option<SettledVia>,
    pub entry_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<gateway_order_entity::Model> for GatewayOrderResponse {
    fn from(m: gateway_order_entity::Model) -> Self {
        Self {
            order_id: m.order_id,
            provider_order_id: m.provider_order_id,
            provider_payment_id: m.provider_payment_id,
            amount: m.amount,
            currency: m.currency,
            status: m.status,
            payment_method: m.payment_method,
            settled_via: m.settled_via,
            entry_id: m.entry_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkPaidRequest {
    pub provider_payment_id: String,
    pub payment_method: Option<String>,
}

/// 下单时保存的客户快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerSnapshot {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
