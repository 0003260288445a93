use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Insufficient wallet balance")]
    InsufficientBalance,

    /// 同一 (类型, 引用) 已存在条目；钱包服务内部将其视为重放成功
    #[error("Duplicate ledger reference")]
    DuplicateReference,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Cashback already claimed")]
    AlreadyClaimed,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 数据库唯一约束冲突（幂等键重复）
    pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
        matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        )
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status_code, error_code, message) = match self {
            AppError::InsufficientBalance => (
                StatusCode::CONFLICT,
                "INSUFFICIENT_BALANCE",
                "Insufficient wallet balance".to_string(),
            ),
            AppError::InvalidTransition(msg) => {
                log::warn!("Invalid transition: {msg}");
                (StatusCode::CONFLICT, "INVALID_TRANSITION", msg.clone())
            }
            AppError::AlreadyClaimed => (
                StatusCode::CONFLICT,
                "ALREADY_CLAIMED",
                "Cashback already claimed".to_string(),
            ),
            AppError::DuplicateReference => (
                StatusCode::CONFLICT,
                "DUPLICATE_REFERENCE",
                "Transaction already processed".to_string(),
            ),
            AppError::InvalidSignature => {
                log::warn!("Rejected request with invalid signature");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_SIGNATURE",
                    "Payment verification failed".to_string(),
                )
            }
            AppError::GatewayUnavailable(msg) => {
                log::error!("Gateway unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "GATEWAY_UNAVAILABLE",
                    "Payment gateway unavailable, please try again".to_string(),
                )
            }
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden".to_string())
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    "Upstream service error".to_string(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_business_errors_map_to_conflict() {
        for err in [
            AppError::InsufficientBalance,
            AppError::AlreadyClaimed,
            AppError::InvalidTransition("already APPROVED".into()),
        ] {
            assert_eq!(err.error_response().status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_gateway_errors_hide_details() {
        let resp = AppError::GatewayUnavailable("connect timeout to api.razorpay.com".into())
            .error_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = AppError::InvalidSignature.error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
