//! Background scheduled tasks for the application.
//!
//! Two recurring jobs: the gateway order expiry sweep and the ledger
//! reconciliation audit. Call `spawn_all` once during startup.

use crate::config::WalletConfig;
use crate::services::{GatewayService, LedgerService};

/// Spawn all background tasks.
///
/// Each task is idempotent and detached via `tokio::spawn`; this does not block.
pub fn spawn_all(gateway_service: GatewayService, ledger_service: LedgerService, cfg: WalletConfig) {
    // 过期订单清扫（每分钟）
    {
        let svc = gateway_service.clone();
        let window = chrono::Duration::minutes(cfg.order_expiry_minutes);
        tokio::spawn(async move {
            loop {
                match svc.expire_stale(window).await {
                    Ok(n) if n > 0 => log::info!("Stale gateway orders expired: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire stale orders: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        });
    }

    // 账本对账审计
    {
        let svc = ledger_service.clone();
        let interval = std::time::Duration::from_secs(cfg.audit_interval_secs.max(60));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match svc.reconcile_all().await {
                    Ok(drifted) if drifted.is_empty() => log::debug!("Ledger audit clean"),
                    Ok(drifted) => log::error!("Ledger audit found {} drifted wallets", drifted.len()),
                    Err(e) => log::error!("Ledger audit failed: {e:?}"),
                }
            }
        });
    }
}
