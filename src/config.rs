use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub razorpay: RazorpayConfig,
    #[serde(default)]
    pub recharge_provider: RechargeProviderConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域的前端来源；为空表示不限制
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    #[serde(default = "default_razorpay_base_url")]
    pub base_url: String,
}

fn default_razorpay_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RechargeProviderConfig {
    pub api_key: String,
    pub base_url: String,
    /// 回调共享密钥，用于校验充值结果回调
    #[serde(default)]
    pub callback_secret: String,
}

impl Default for RechargeProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.kwikapi.com".to_string(),
            callback_secret: String::new(),
        }
    }
}

/// 钱包业务参数（金额单位：paise）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub min_topup: i64,
    pub max_topup: i64,
    pub min_withdrawal: i64,
    pub max_withdrawal: i64,
    #[serde(default = "default_min_recharge")]
    pub min_recharge: i64,
    #[serde(default = "default_max_recharge")]
    pub max_recharge: i64,
    /// 充值佣金，基点 (1bp = 0.01%)
    pub recharge_commission_bp: i64,
    /// CREATED 状态的网关订单超过该时长即被清扫为 EXPIRED
    pub order_expiry_minutes: i64,
    pub audit_interval_secs: u64,
}

fn default_min_recharge() -> i64 {
    10_00
}

fn default_max_recharge() -> i64 {
    10_000_00
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            min_topup: 100_00,
            max_topup: 50_000_00,
            min_withdrawal: 500_00,
            max_withdrawal: 25_000_00,
            min_recharge: default_min_recharge(),
            max_recharge: default_max_recharge(),
            recharge_commission_bp: 200,
            order_expiry_minutes: 30,
            audit_interval_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                let defaults = WalletConfig::default();
                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        allowed_origins: Vec::new(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                    },
                    razorpay: RazorpayConfig {
                        key_id: get_env("RAZORPAY_KEY_ID").unwrap_or_default(),
                        key_secret: get_env("RAZORPAY_KEY_SECRET").unwrap_or_default(),
                        webhook_secret: get_env("RAZORPAY_WEBHOOK_SECRET").unwrap_or_default(),
                        base_url: get_env("RAZORPAY_BASE_URL")
                            .unwrap_or_else(default_razorpay_base_url),
                    },
                    recharge_provider: RechargeProviderConfig {
                        api_key: get_env("RECHARGE_API_KEY").unwrap_or_default(),
                        base_url: get_env("RECHARGE_BASE_URL")
                            .unwrap_or_else(|| RechargeProviderConfig::default().base_url),
                        callback_secret: get_env("RECHARGE_CALLBACK_SECRET").unwrap_or_default(),
                    },
                    wallet: WalletConfig {
                        min_topup: get_env_parse("WALLET_MIN_TOPUP", defaults.min_topup),
                        max_topup: get_env_parse("WALLET_MAX_TOPUP", defaults.max_topup),
                        min_withdrawal: get_env_parse(
                            "WALLET_MIN_WITHDRAWAL",
                            defaults.min_withdrawal,
                        ),
                        max_withdrawal: get_env_parse(
                            "WALLET_MAX_WITHDRAWAL",
                            defaults.max_withdrawal,
                        ),
                        min_recharge: get_env_parse("RECHARGE_MIN_AMOUNT", defaults.min_recharge),
                        max_recharge: get_env_parse("RECHARGE_MAX_AMOUNT", defaults.max_recharge),
                        recharge_commission_bp: get_env_parse(
                            "RECHARGE_COMMISSION_BP",
                            defaults.recharge_commission_bp,
                        ),
                        order_expiry_minutes: get_env_parse(
                            "ORDER_EXPIRY_MINUTES",
                            defaults.order_expiry_minutes,
                        ),
                        audit_interval_secs: get_env_parse(
                            "AUDIT_INTERVAL_SECS",
                            defaults.audit_interval_secs,
                        ),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("CORS_ALLOWED_ORIGINS") {
            config.server.allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("RAZORPAY_KEY_ID") {
            config.razorpay.key_id = v;
        }
        if let Ok(v) = env::var("RAZORPAY_KEY_SECRET") {
            config.razorpay.key_secret = v;
        }
        if let Ok(v) = env::var("RAZORPAY_WEBHOOK_SECRET") {
            config.razorpay.webhook_secret = v;
        }
        if let Ok(v) = env::var("RECHARGE_API_KEY") {
            config.recharge_provider.api_key = v;
        }
        if let Ok(v) = env::var("RECHARGE_CALLBACK_SECRET") {
            config.recharge_provider.callback_secret = v;
        }
        if let Ok(v) = env::var("RECHARGE_COMMISSION_BP")
            && let Ok(n) = v.parse()
        {
            config.wallet.recharge_commission_bp = n;
        }
        if let Ok(v) = env::var("ORDER_EXPIRY_MINUTES")
            && let Ok(n) = v.parse()
        {
            config.wallet.order_expiry_minutes = n;
        }

        config.wallet.validate()?;
        Ok(config)
    }
}

impl WalletConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_topup <= 0 || self.min_topup > self.max_topup {
            return Err("wallet.min_topup 必须为正且不大于 max_topup".to_string());
        }
        if self.min_withdrawal <= 0 || self.min_withdrawal > self.max_withdrawal {
            return Err("wallet.min_withdrawal 必须为正且不大于 max_withdrawal".to_string());
        }
        if self.min_recharge <= 0 || self.min_recharge > self.max_recharge {
            return Err("wallet.min_recharge 必须为正且不大于 max_recharge".to_string());
        }
        if !(0..=10_000).contains(&self.recharge_commission_bp) {
            return Err("wallet.recharge_commission_bp 必须在 0..=10000 之间".to_string());
        }
        Ok(())
    }
}
