use crate::error::AppError;
use crate::models::RechargeCallback;
use crate::services::{GatewayService, RechargeService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use log::{error, info, warn};

pub const RAZORPAY_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

/// 支付网关 webhook
///
/// 签名错误返回 401，数据库等临时故障返回 500 让网关重试；
/// 重复投递和乱序投递由订单状态 CAS 吸收，统一应答 200。
pub async fn razorpay_webhook(
    req: HttpRequest,
    body: web::Bytes,
    gateway_service: web::Data<GatewayService>,
) -> Result<HttpResponse> {
    let signature = match req.headers().get(RAZORPAY_SIGNATURE_HEADER) {
        Some(sig) => sig.to_str().unwrap_or(""),
        None => {
            warn!("Missing {RAZORPAY_SIGNATURE_HEADER} header");
            return Ok(AppError::InvalidSignature.error_response());
        }
    };

    match gateway_service.consume_webhook(&body, signature).await {
        Ok(Some(settlement)) => {
            info!(
                "Webhook processed for order {} (status {:?}, applied {})",
                settlement.order.order_id, settlement.order.status, settlement.applied
            );
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "received": true,
                "applied": settlement.applied
            })))
        }
        Ok(None) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "received": true,
            "applied": false
        }))),
        Err(e) => {
            error!("Failed to process webhook: {e}");
            Ok(e.error_response())
        }
    }
}

/// 充值渠道结果回调
pub async fn recharge_callback(
    body: web::Json<RechargeCallback>,
    recharge_service: web::Data<RechargeService>,
) -> Result<HttpResponse> {
    match recharge_service.handle_callback(body.into_inner()).await {
        Ok(recharge) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": recharge
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhook")
            .route("/razorpay", web::post().to(razorpay_webhook))
            .route("/recharge", web::post().to(recharge_callback)),
    );
}
