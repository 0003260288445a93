use crate::handlers::current_user;
use crate::models::*;
use crate::services::GatewayService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/gateway/orders",
    tag = "gateway",
    request_body = CreateOrderRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建支付订单成功", body = CreateOrderResponse),
        (status = 400, description = "金额超出范围"),
        (status = 503, description = "支付网关不可用")
    )
)]
pub async fn create_order(
    gateway_service: web::Data<GatewayService>,
    req: HttpRequest,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match gateway_service.create_order(user.id, body.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": order
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/gateway/orders/{order_id}",
    tag = "gateway",
    params(
        ("order_id" = String, Path, description = "订单号")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "订单状态", body = GatewayOrderResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order(
    gateway_service: web::Data<GatewayService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match gateway_service.get_order(&path, user.id).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": order
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/gateway/return",
    tag = "gateway",
    request_body = ReturnPathConfirmation,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "支付确认完成", body = Settlement),
        (status = 401, description = "签名校验失败"),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn confirm_return(
    gateway_service: web::Data<GatewayService>,
    req: HttpRequest,
    body: web::Json<ReturnPathConfirmation>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match gateway_service
        .confirm_from_return_path(user.id, body.into_inner())
        .await
    {
        Ok(settlement) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": settlement
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn gateway_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gateway")
            .route("/orders", web::post().to(create_order))
            .route("/orders/{order_id}", web::get().to(get_order))
            .route("/return", web::post().to(confirm_return)),
    );
}
