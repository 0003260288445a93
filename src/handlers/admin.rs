use crate::handlers::require_staff;
use crate::models::*;
use crate::services::{
    CommissionService, GatewayService, LedgerService, PenaltyService, WalletRequestService,
};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/admin/wallet-requests",
    tag = "admin",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("status" = Option<String>, Query, description = "PENDING / APPROVED / REJECTED"),
        ("request_type" = Option<String>, Query, description = "TOPUP / WITHDRAWAL"),
        ("user_id" = Option<i64>, Query, description = "用户 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "申请列表"),
        (status = 403, description = "无权限")
    )
)]
pub async fn list_wallet_requests(
    request_service: web::Data<WalletRequestService>,
    req: HttpRequest,
    query: web::Query<WalletRequestQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_staff(&req) {
        return Ok(e.error_response());
    }

    match request_service.list(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/wallet-requests/{id}/decision",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "申请 ID")
    ),
    request_body = DecideWalletRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "审批完成", body = WalletRequestResponse),
        (status = 409, description = "申请已处理或余额不足")
    )
)]
pub async fn decide_wallet_request(
    request_service: web::Data<WalletRequestService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<DecideWalletRequest>,
) -> Result<HttpResponse> {
    let staff = match require_staff(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match request_service
        .decide(path.into_inner(), staff.id, body.into_inner())
        .await
    {
        Ok(request) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": request
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/penalties",
    tag = "admin",
    request_body = ApplyPenaltyRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "处罚已扣款", body = PenaltyResponse),
        (status = 409, description = "余额不足")
    )
)]
pub async fn apply_penalty(
    penalty_service: web::Data<PenaltyService>,
    req: HttpRequest,
    body: web::Json<ApplyPenaltyRequest>,
) -> Result<HttpResponse> {
    let staff = match require_staff(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match penalty_service.apply(staff.id, body.into_inner()).await {
        Ok(penalty) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": penalty
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/cashback",
    tag = "admin",
    request_body = IssueCashbackRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "返现已发放", body = TransactionEntryResponse)
    )
)]
pub async fn issue_cashback(
    commission_service: web::Data<CommissionService>,
    req: HttpRequest,
    body: web::Json<IssueCashbackRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_staff(&req) {
        return Ok(e.error_response());
    }

    match commission_service.issue_cashback(body.into_inner()).await {
        Ok(entry) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": TransactionEntryResponse::from(entry)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/cashback/{id}/void",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "返现条目 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "返现已作废", body = TransactionEntryResponse),
        (status = 409, description = "已领取")
    )
)]
pub async fn void_cashback(
    commission_service: web::Data<CommissionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_staff(&req) {
        return Ok(e.error_response());
    }

    match commission_service.void_cashback(path.into_inner()).await {
        Ok(entry) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": TransactionEntryResponse::from(entry)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/gateway/orders/{order_id}/mark-paid",
    tag = "admin",
    params(
        ("order_id" = String, Path, description = "订单号")
    ),
    request_body = MarkPaidRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "人工补单完成", body = Settlement),
        (status = 409, description = "订单已是终态")
    )
)]
pub async fn mark_order_paid(
    gateway_service: web::Data<GatewayService>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<MarkPaidRequest>,
) -> Result<HttpResponse> {
    let staff = match require_staff(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match gateway_service
        .admin_mark_paid(&path, staff.id, body.into_inner())
        .await
    {
        Ok(settlement) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": settlement
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/gateway/orders/{order_id}/expire",
    tag = "admin",
    params(
        ("order_id" = String, Path, description = "订单号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单已过期", body = GatewayOrderResponse),
        (status = 409, description = "订单已是终态")
    )
)]
pub async fn expire_order(
    gateway_service: web::Data<GatewayService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(e) = require_staff(&req) {
        return Ok(e.error_response());
    }

    match gateway_service.expire(&path).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": order
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/gateway/orders/{order_id}/sync",
    tag = "admin",
    params(
        ("order_id" = String, Path, description = "订单号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已向网关同步订单状态", body = GatewayOrderResponse),
        (status = 503, description = "支付网关不可用")
    )
)]
pub async fn sync_order(
    gateway_service: web::Data<GatewayService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(e) = require_staff(&req) {
        return Ok(e.error_response());
    }

    match gateway_service.sync_order_status(&path).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": order
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/wallets/{user_id}/reconcile",
    tag = "admin",
    params(
        ("user_id" = i64, Path, description = "用户 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "对账结果", body = Reconciliation)
    )
)]
pub async fn reconcile_wallet(
    ledger_service: web::Data<LedgerService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_staff(&req) {
        return Ok(e.error_response());
    }

    match ledger_service.reconcile(path.into_inner()).await {
        Ok(rec) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": rec
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/wallet-requests", web::get().to(list_wallet_requests))
            .route(
                "/wallet-requests/{id}/decision",
                web::post().to(decide_wallet_request),
            )
            .route("/penalties", web::post().to(apply_penalty))
            .route("/cashback", web::post().to(issue_cashback))
            .route("/cashback/{id}/void", web::post().to(void_cashback))
            .route(
                "/gateway/orders/{order_id}/mark-paid",
                web::post().to(mark_order_paid),
            )
            .route("/gateway/orders/{order_id}/expire", web::post().to(expire_order))
            .route("/gateway/orders/{order_id}/sync", web::post().to(sync_order))
            .route("/wallets/{user_id}/reconcile", web::get().to(reconcile_wallet)),
    );
}
