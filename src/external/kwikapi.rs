use crate::config::RechargeProviderConfig;
use crate::error::{AppError, AppResult};
use crate::external::{RechargeOutcome, RechargeProvider, RechargeSubmission};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RechargeReply {
    status: String,
    #[serde(default)]
    opr_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// 手机充值渠道（KWIKAPI 风格的 GET 接口，金额单位为卢比）
#[derive(Clone)]
pub struct KwikApiClient {
    client: Client,
    config: RechargeProviderConfig,
}

impl KwikApiClient {
    pub fn new(config: RechargeProviderConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent("wallet-core/recharge")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl RechargeProvider for KwikApiClient {
    async fn submit(&self, req: &RechargeSubmission) -> AppResult<RechargeOutcome> {
        let url = format!(
            "{}/api/v2/recharge.php",
            self.config.base_url.trim_end_matches('/')
        );
        let rupees = format!("{}.{:02}", req.amount / 100, req.amount % 100);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("number", req.mobile.as_str()),
                ("amount", rupees.as_str()),
                ("opid", req.operator.as_str()),
                ("order_id", req.recharge_id.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "充值渠道返回 HTTP {}",
                response.status().as_u16()
            )));
        }

        let reply: RechargeReply = response.json().await?;
        Ok(outcome_from(reply))
    }
}

fn outcome_from(reply: RechargeReply) -> RechargeOutcome {
    match reply.status.to_ascii_uppercase().as_str() {
        "SUCCESS" => RechargeOutcome::Success {
            provider_ref: reply.opr_id,
        },
        "FAILED" | "FAILURE" => {
            log::warn!(
                "Recharge rejected by provider: {}",
                reply.message.as_deref().unwrap_or("-")
            );
            RechargeOutcome::Failed {
                provider_ref: reply.opr_id,
            }
        }
        _ => RechargeOutcome::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_status_mapping() {
        let reply = |s: &str| RechargeReply {
            status: s.to_string(),
            opr_id: Some("OP1".to_string()),
            message: None,
        };
        assert_eq!(
            outcome_from(reply("success")),
            RechargeOutcome::Success {
                provider_ref: Some("OP1".to_string())
            }
        );
        assert!(matches!(outcome_from(reply("FAILURE")), RechargeOutcome::Failed { .. }));
        assert_eq!(outcome_from(reply("PENDING")), RechargeOutcome::Pending);
    }
}
