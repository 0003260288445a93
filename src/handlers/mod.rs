pub mod admin;
pub mod gateway;
pub mod recharge;
pub mod wallet;
pub mod webhook;

pub use admin::admin_config;
pub use gateway::gateway_config;
pub use recharge::recharge_config;
pub use wallet::wallet_config;
pub use webhook::webhook_config;

use crate::error::{AppError, AppResult};
use crate::middlewares::AuthUser;
use actix_web::{HttpMessage, HttpRequest};

/// 由认证中间件写入的当前调用方
pub(crate) fn current_user(req: &HttpRequest) -> AppResult<AuthUser> {
    req.extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

/// 后台操作仅限 admin / employee
pub(crate) fn require_staff(req: &HttpRequest) -> AppResult<AuthUser> {
    let user = current_user(req)?;
    if !user.role.is_staff() {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}
