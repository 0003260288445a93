use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use wallet_core::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{KwikApiClient, LogNotifier, Notifier, RazorpayClient},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret);

    // 外部服务
    let gateway = Arc::new(
        RazorpayClient::new(config.razorpay.clone()).expect("Failed to build gateway client"),
    );
    let recharge_provider = Arc::new(
        KwikApiClient::new(config.recharge_provider.clone())
            .expect("Failed to build recharge client"),
    );
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    // 创建服务
    let ledger_service = LedgerService::new(pool.clone());
    let wallet_service = WalletService::new(pool.clone());
    let wallet_request_service =
        WalletRequestService::new(pool.clone(), config.wallet.clone(), notifier.clone());
    let gateway_service = GatewayService::new(
        pool.clone(),
        gateway,
        notifier.clone(),
        config.razorpay.key_secret.clone(),
        config.razorpay.webhook_secret.clone(),
        config.wallet.clone(),
    );
    let commission_service = CommissionService::new(pool.clone());
    let penalty_service = PenaltyService::new(pool.clone(), notifier.clone());
    let recharge_service = RechargeService::new(
        pool.clone(),
        recharge_provider,
        config.wallet.clone(),
        config.recharge_provider.callback_secret.clone(),
    );

    tasks::spawn_all(
        gateway_service.clone(),
        ledger_service.clone(),
        config.wallet.clone(),
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let allowed_origins = config.server.allowed_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(&allowed_origins))
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(ledger_service.clone()))
            .app_data(web::Data::new(wallet_service.clone()))
            .app_data(web::Data::new(wallet_request_service.clone()))
            .app_data(web::Data::new(gateway_service.clone()))
            .app_data(web::Data::new(commission_service.clone()))
            .app_data(web::Data::new(penalty_service.clone()))
            .app_data(web::Data::new(recharge_service.clone()))
            .route("/health", web::get().to(|| async { HttpResponse::Ok().body("ok") }))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::wallet_config)
                    .configure(handlers::gateway_config)
                    .configure(handlers::recharge_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
