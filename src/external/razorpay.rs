use crate::config::RazorpayConfig;
use crate::error::{AppError, AppResult};
use crate::external::{PaymentGateway, ProviderOrder, ProviderOrderRequest, ProviderPaymentStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OrderObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentList {
    items: Vec<PaymentObject>,
}

#[derive(Debug, Deserialize)]
struct PaymentObject {
    id: String,
    status: String,
    method: Option<String>,
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent("wallet-core/razorpay")
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn error_text(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        format!("HTTP {}: {}", status.as_u16(), body)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, req: &ProviderOrderRequest) -> AppResult<ProviderOrder> {
        let body = CreateOrderBody {
            amount: req.amount,
            currency: &req.currency,
            receipt: &req.order_id,
            notes: serde_json::json!({
                "user_id": req.user_id,
                "customer_email": req.customer_email,
                "customer_phone": req.customer_phone,
            }),
        };

        let response = self
            .client
            .post(self.url("/v1/orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "创建网关订单失败: {}",
                Self::error_text(response).await
            )));
        }

        let order: OrderObject = response.json().await?;
        // 前端用公开 key_id + 网关订单号拉起收银台
        Ok(ProviderOrder {
            provider_order_id: order.id,
            session_token: self.config.key_id.clone(),
        })
    }

    async fn fetch_payment_status(&self, provider_order_id: &str) -> AppResult<ProviderPaymentStatus> {
        let response = self
            .client
            .get(self.url(&format!("/v1/orders/{provider_order_id}/payments")))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "查询网关订单失败: {}",
                Self::error_text(response).await
            )));
        }

        let payments: PaymentList = response.json().await?;
        Ok(payment_status_from(payments.items))
    }
}

/// captured 即视为已付款；全部失败才算失败，否则仍在处理中
fn payment_status_from(items: Vec<PaymentObject>) -> ProviderPaymentStatus {
    if items.is_empty() {
        return ProviderPaymentStatus::Pending;
    }
    if let Some(p) = items.iter().find(|p| p.status == "captured") {
        return ProviderPaymentStatus::Paid {
            payment_id: p.id.clone(),
            payment_method: p.method.clone(),
        };
    }
    if items.iter().all(|p| p.status == "failed") {
        ProviderPaymentStatus::Failed
    } else {
        ProviderPaymentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(id: &str, status: &str) -> PaymentObject {
        PaymentObject {
            id: id.to_string(),
            status: status.to_string(),
            method: Some("upi".to_string()),
        }
    }

    #[test]
    fn test_captured_payment_wins() {
        let status = payment_status_from(vec![payment("pay_1", "failed"), payment("pay_2", "captured")]);
        assert_eq!(
            status,
            ProviderPaymentStatus::Paid {
                payment_id: "pay_2".to_string(),
                payment_method: Some("upi".to_string()),
            }
        );
    }

    #[test]
    fn test_failed_and_pending() {
        assert_eq!(payment_status_from(vec![]), ProviderPaymentStatus::Pending);
        assert_eq!(
            payment_status_from(vec![payment("pay_1", "failed")]),
            ProviderPaymentStatus::Failed
        );
        assert_eq!(
            payment_status_from(vec![payment("pay_1", "failed"), payment("pay_2", "authorized")]),
            ProviderPaymentStatus::Pending
        );
    }

    #[test]
    fn test_base_url_join() {
        let client = RazorpayClient::new(RazorpayConfig {
            key_id: "rzp_test".to_string(),
            key_secret: "secret".to_string(),
            webhook_secret: "whsec".to_string(),
            base_url: "https://api.razorpay.com/".to_string(),
        })
        .unwrap();
        assert_eq!(client.url("/v1/orders"), "https://api.razorpay.com/v1/orders");
    }
}
