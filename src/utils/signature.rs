//! 支付网关 / 充值渠道的 HMAC-SHA256 签名校验

use crate::error::{AppError, AppResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, payload: &[u8]) -> AppResult<HmacSha256> {
    if secret.is_empty() {
        return Err(AppError::ConfigError("Signing secret is not configured".to_string()));
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::ConfigError(format!("Invalid signing secret: {e}")))?;
    mac.update(payload);
    Ok(mac)
}

/// 计算十六进制小写签名
pub fn sign_hex(secret: &str, payload: &[u8]) -> AppResult<String> {
    Ok(hex::encode(mac_for(secret, payload)?.finalize().into_bytes()))
}

/// 常量时间比较；签名格式错误或不匹配一律返回 `InvalidSignature`
pub fn verify_hex(secret: &str, payload: &[u8], signature: &str) -> AppResult<()> {
    let expected = hex::decode(signature.trim()).map_err(|_| AppError::InvalidSignature)?;
    mac_for(secret, payload)?
        .verify_slice(&expected)
        .map_err(|_| AppError::InvalidSignature)
}
