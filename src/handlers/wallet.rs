use crate::handlers::current_user;
use crate::models::*;
use crate::services::{CommissionService, LedgerService, WalletRequestService, WalletService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/wallet",
    tag = "wallet",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取钱包余额成功", body = WalletResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_wallet(
    wallet_service: web::Data<WalletService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match wallet_service.get_wallet(user.id).await {
        Ok(wallet) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": wallet
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/wallet/transactions",
    tag = "wallet",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("entry_type" = Option<String>, Query, description = "条目类型，如 DEPOSIT"),
        ("status" = Option<String>, Query, description = "条目状态，如 COMPLETED"),
        ("from" = Option<String>, Query, description = "起始时间 (RFC3339)"),
        ("to" = Option<String>, Query, description = "结束时间 (RFC3339)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取交易明细成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_transactions(
    ledger_service: web::Data<LedgerService>,
    req: HttpRequest,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match ledger_service.list_entries(user.id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/wallet/requests",
    tag = "wallet",
    request_body = SubmitWalletRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "申请已提交", body = WalletRequestResponse),
        (status = 400, description = "金额超出范围或流水号重复"),
        (status = 409, description = "余额不足")
    )
)]
pub async fn submit_request(
    request_service: web::Data<WalletRequestService>,
    req: HttpRequest,
    body: web::Json<SubmitWalletRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match request_service.submit(user.id, body.into_inner()).await {
        Ok(request) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": request,
            "message": "申请已提交，等待审核"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/wallet/cashback/{id}/reveal",
    tag = "wallet",
    params(
        ("id" = i64, Path, description = "返现条目 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "刮开成功", body = TransactionEntryResponse),
        (status = 404, description = "返现不存在"),
        (status = 409, description = "状态不允许")
    )
)]
pub async fn reveal_cashback(
    commission_service: web::Data<CommissionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match commission_service.reveal(path.into_inner(), user.id).await {
        Ok(entry) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": TransactionEntryResponse::from(entry)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/wallet/cashback/{id}/claim",
    tag = "wallet",
    params(
        ("id" = i64, Path, description = "返现条目 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "领取成功", body = ClaimCashbackResponse),
        (status = 404, description = "返现不存在"),
        (status = 409, description = "已领取")
    )
)]
pub async fn claim_cashback(
    commission_service: web::Data<CommissionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match commission_service.claim(path.into_inner(), user.id).await {
        Ok(claimed) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": claimed
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn wallet_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wallet")
            .route("", web::get().to(get_wallet))
            .route("/transactions", web::get().to(get_transactions))
            .route("/requests", web::post().to(submit_request))
            .route("/cashback/{id}/reveal", web::post().to(reveal_cashback))
            .route("/cashback/{id}/claim", web::post().to(claim_cashback)),
    );
}
