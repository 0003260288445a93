use crate::handlers::current_user;
use crate::models::*;
use crate::services::RechargeService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/recharge",
    tag = "recharge",
    request_body = StartRechargeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "充值已提交", body = RechargeResponse),
        (status = 400, description = "请求参数错误"),
        (status = 409, description = "余额不足")
    )
)]
pub async fn start_recharge(
    recharge_service: web::Data<RechargeService>,
    req: HttpRequest,
    body: web::Json<StartRechargeRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match recharge_service.start(user.id, body.into_inner()).await {
        Ok(recharge) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": recharge
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn recharge_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/recharge").route("", web::post().to(start_recharge)));
}
