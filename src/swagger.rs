use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    CashbackState, EntryStatus, EntryType, GatewayOrderStatus, RechargeStatus, SettledVia,
    WalletRequestStatus, WalletRequestType,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::wallet::get_wallet,
        handlers::wallet::get_transactions,
        handlers::wallet::submit_request,
        handlers::wallet::reveal_cashback,
        handlers::wallet::claim_cashback,
        handlers::gateway::create_order,
        handlers::gateway::get_order,
        handlers::gateway::confirm_return,
        handlers::recharge::start_recharge,
        handlers::admin::list_wallet_requests,
        handlers::admin::decide_wallet_request,
        handlers::admin::apply_penalty,
        handlers::admin::issue_cashback,
        handlers::admin::void_cashback,
        handlers::admin::mark_order_paid,
        handlers::admin::expire_order,
        handlers::admin::sync_order,
        handlers::admin::reconcile_wallet,
    ),
    components(
        schemas(
            EntryType,
            EntryStatus,
            CashbackState,
            GatewayOrderStatus,
            SettledVia,
            RechargeStatus,
            WalletRequestType,
            WalletRequestStatus,
            WalletResponse,
            TransactionEntryResponse,
            Reconciliation,
            IssueCashbackRequest,
            ClaimCashbackResponse,
            SubmitWalletRequest,
            Decision,
            DecideWalletRequest,
            WalletRequestResponse,
            CreateOrderRequest,
            CreateOrderResponse,
            ReturnPathConfirmation,
            Settlement,
            GatewayOrderResponse,
            MarkPaidRequest,
            ApplyPenaltyRequest,
            PenaltyResponse,
            StartRechargeRequest,
            RechargeResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "wallet", description = "Wallet balance, ledger and cashback API"),
        (name = "gateway", description = "Payment gateway order API"),
        (name = "recharge", description = "Mobile recharge API"),
        (name = "admin", description = "Back-office wallet operations"),
    ),
    info(
        title = "Wallet Core API",
        version = "1.0.0",
        description = "Wallet ledger and payment settlement REST API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_wallet_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/wallet"));
        assert!(doc.paths.paths.contains_key("/admin/wallet-requests/{id}/decision"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
