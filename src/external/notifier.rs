use crate::entities::WalletRequestStatus;
use crate::error::AppResult;
use async_trait::async_trait;

/// 资金事件通知；投递方式（邮件 / 短信）由具体实现决定
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PenaltyApplied {
        user_id: i64,
        penalty_id: i64,
        amount: i64,
        reason: String,
        new_balance: i64,
    },
    WalletRequestDecided {
        user_id: i64,
        request_id: i64,
        status: WalletRequestStatus,
        amount: i64,
    },
    GatewayPaymentSettled {
        user_id: i64,
        order_id: String,
        amount: i64,
    },
}

impl Notification {
    pub fn user_id(&self) -> i64 {
        match self {
            Notification::PenaltyApplied { user_id, .. }
            | Notification::WalletRequestDecided { user_id, .. }
            | Notification::GatewayPaymentSettled { user_id, .. } => *user_id,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> AppResult<()>;
}

/// 默认实现：只写日志
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> AppResult<()> {
        log::info!(
            "Notify user {}: {:?}",
            notification.user_id(),
            notification
        );
        Ok(())
    }
}
