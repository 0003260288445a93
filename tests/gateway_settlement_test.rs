mod common;

use common::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::atomic::Ordering;
use wallet_core::entities::{
    EntryType, GatewayOrderStatus, SettledVia, gateway_order_entity as orders,
    transaction_entry_entity as entries,
};
use wallet_core::error::AppError;
use wallet_core::external::{Notification, ProviderPaymentStatus};
use wallet_core::models::{
    CreateOrderRequest, CreateOrderResponse, MarkPaidRequest, ReturnPathConfirmation,
};
use wallet_core::utils::sign_hex;

const USER: i64 = 21;

async fn create_order(app: &TestApp, amount: i64) -> CreateOrderResponse {
    app.orders
        .create_order(
            USER,
            CreateOrderRequest {
                amount,
                customer_name: Some("Asha".to_string()),
                customer_email: Some("asha@example.com".to_string()),
                customer_phone: Some("9876543210".to_string()),
            },
        )
        .await
        .unwrap()
}

fn webhook_body(order: &CreateOrderResponse, payment_id: &str, status: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "event_id": format!("evt_{payment_id}"),
        "order_id": order.order_id,
        "provider_order_id": order.provider_order_id,
        "payment_id": payment_id,
        "status": status,
        "payment_method": "upi"
    }))
    .unwrap()
}

fn return_confirmation(order: &CreateOrderResponse, payment_id: &str) -> ReturnPathConfirmation {
    let payload = format!("{}|{}", order.provider_order_id, payment_id);
    ReturnPathConfirmation {
        order_id: order.order_id.clone(),
        provider_payment_id: payment_id.to_string(),
        signature: sign_hex(KEY_SECRET, payload.as_bytes()).unwrap(),
    }
}

async fn deposit_count(app: &TestApp) -> usize {
    entries::Entity::find()
        .filter(entries::Column::UserId.eq(USER))
        .filter(entries::Column::EntryType.eq(EntryType::Deposit))
        .all(&app.db)
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn test_webhook_before_return_path_credits_once() {
    let app = TestApp::new().await;
    let order = create_order(&app, 200_00).await;
    assert!(order.order_id.starts_with("ORD"));
    assert_eq!(order.provider_order_id, format!("order_{}", order.order_id));

    let body = webhook_body(&order, "pay_001", "PAID");
    let signature = sign_hex(WEBHOOK_SECRET, &body).unwrap();
    let settlement = app
        .orders
        .consume_webhook(&body, &signature)
        .await
        .unwrap()
        .unwrap();
    assert!(settlement.applied);
    assert_eq!(settlement.new_balance, Some(200_00));
    assert_eq!(settlement.order.status, GatewayOrderStatus::Paid);
    assert_eq!(settlement.order.settled_via, Some(SettledVia::Webhook));

    let late = app
        .orders
        .confirm_from_return_path(USER, return_confirmation(&order, "pay_001"))
        .await
        .unwrap();
    assert!(!late.applied);
    assert_eq!(late.order.status, GatewayOrderStatus::Paid);
    assert_eq!(late.order.settled_via, Some(SettledVia::Webhook));

    assert_eq!(app.balance(USER).await, 200_00);
    assert_eq!(deposit_count(&app).await, 1);
    app.assert_reconciled(USER).await;
}

#[tokio::test]
async fn test_webhook_replay_yields_one_entry() {
    let app = TestApp::new().await;
    let order = create_order(&app, 500_00).await;

    let body = webhook_body(&order, "pay_002", "PAID");
    let signature = sign_hex(WEBHOOK_SECRET, &body).unwrap();
    let mut applied = 0;
    for _ in 0..3 {
        let settlement = app
            .orders
            .consume_webhook(&body, &signature)
            .await
            .unwrap()
            .unwrap();
        if settlement.applied {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(deposit_count(&app).await, 1);
    assert_eq!(app.balance(USER).await, 500_00);

    let stored = app.orders.get_order(&order.order_id, USER).await.unwrap();
    assert_eq!(stored.provider_payment_id.as_deref(), Some("pay_002"));
    assert_eq!(stored.payment_method.as_deref(), Some("upi"));
    assert!(stored.entry_id.is_some());
}

#[tokio::test]
async fn test_return_path_settles_and_notifies() {
    let app = TestApp::new().await;
    let order = create_order(&app, 150_00).await;

    let settlement = app
        .orders
        .confirm_from_return_path(USER, return_confirmation(&order, "pay_003"))
        .await
        .unwrap();
    assert!(settlement.applied);
    assert_eq!(settlement.order.settled_via, Some(SettledVia::ReturnPath));
    assert_eq!(app.balance(USER).await, 150_00);

    // 通知在后台任务中发送
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(app.notifier.sent().iter().any(|n| matches!(
        n,
        Notification::GatewayPaymentSettled { amount: 150_00, .. }
    )));
}

#[tokio::test]
async fn test_signature_mismatch_is_rejected() {
    let app = TestApp::new().await;
    let order = create_order(&app, 200_00).await;

    let body = webhook_body(&order, "pay_004", "PAID");
    let forged = sign_hex("wrong-secret", &body).unwrap();
    let err = app.orders.consume_webhook(&body, &forged).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidSignature));

    let mut conf = return_confirmation(&order, "pay_004");
    conf.signature = "deadbeef".to_string();
    let err = app
        .orders
        .confirm_from_return_path(USER, conf)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSignature));

    let stored = app.orders.get_order(&order.order_id, USER).await.unwrap();
    assert_eq!(stored.status, GatewayOrderStatus::Created);
    assert_eq!(app.balance(USER).await, 0);
}

#[tokio::test]
async fn test_return_path_for_foreign_order_is_forbidden() {
    let app = TestApp::new().await;
    let order = create_order(&app, 200_00).await;

    let err = app
        .orders
        .confirm_from_return_path(USER + 1, return_confirmation(&order, "pay_005"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = app
        .orders
        .get_order(&order.order_id, USER + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_provider_failure_marks_order_failed() {
    let app = TestApp::new().await;
    app.gateway.fail_create.store(true, Ordering::SeqCst);

    let err = app
        .orders
        .create_order(
            USER,
            CreateOrderRequest {
                amount: 200_00,
                customer_name: None,
                customer_email: None,
                customer_phone: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::GatewayUnavailable(_)));

    let failed = orders::Entity::find()
        .filter(orders::Column::UserId.eq(USER))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, GatewayOrderStatus::Failed);
}

#[tokio::test]
async fn test_amount_outside_topup_limits_is_rejected() {
    let app = TestApp::new().await;
    let err = app
        .orders
        .create_order(
            USER,
            CreateOrderRequest {
                amount: 10,
                customer_name: None,
                customer_email: None,
                customer_phone: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_failed_webhook_then_late_paid_is_not_credited() {
    let app = TestApp::new().await;
    let order = create_order(&app, 200_00).await;

    let body = webhook_body(&order, "pay_006", "FAILED");
    let sig = sign_hex(WEBHOOK_SECRET, &body).unwrap();
    let settlement = app
        .orders
        .consume_webhook(&body, &sig)
        .await
        .unwrap()
        .unwrap();
    assert!(settlement.applied);
    assert_eq!(settlement.order.status, GatewayOrderStatus::Failed);

    let body = webhook_body(&order, "pay_006", "PAID");
    let sig = sign_hex(WEBHOOK_SECRET, &body).unwrap();
    let settlement = app
        .orders
        .consume_webhook(&body, &sig)
        .await
        .unwrap()
        .unwrap();
    assert!(!settlement.applied);
    assert_eq!(settlement.order.status, GatewayOrderStatus::Failed);
    assert_eq!(app.balance(USER).await, 0);
}

#[tokio::test]
async fn test_webhook_for_unknown_order_is_acknowledged() {
    let app = TestApp::new().await;
    let body = serde_json::to_vec(&serde_json::json!({
        "order_id": "ORDmissing",
        "payment_id": "pay_x",
        "status": "PAID"
    }))
    .unwrap();
    let sig = sign_hex(WEBHOOK_SECRET, &body).unwrap();
    assert!(app.orders.consume_webhook(&body, &sig).await.unwrap().is_none());

    let garbage = b"not json".to_vec();
    let sig = sign_hex(WEBHOOK_SECRET, &garbage).unwrap();
    let err = app.orders.consume_webhook(&garbage, &sig).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_expire_and_admin_mark_paid_share_the_gate() {
    let app = TestApp::new().await;
    let expired = create_order(&app, 200_00).await;
    let manual = create_order(&app, 300_00).await;

    let order = app.orders.expire(&expired.order_id).await.unwrap();
    assert_eq!(order.status, GatewayOrderStatus::Expired);
    let err = app.orders.expire(&expired.order_id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let err = app
        .orders
        .admin_mark_paid(
            &expired.order_id,
            1,
            MarkPaidRequest {
                provider_payment_id: "pay_late".to_string(),
                payment_method: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let settlement = app
        .orders
        .admin_mark_paid(
            &manual.order_id,
            1,
            MarkPaidRequest {
                provider_payment_id: "pay_manual".to_string(),
                payment_method: Some("neft".to_string()),
            },
        )
        .await
        .unwrap();
    assert!(settlement.applied);
    assert_eq!(settlement.order.settled_via, Some(SettledVia::Admin));
    assert_eq!(app.balance(USER).await, 300_00);
}

#[tokio::test]
async fn test_sync_settles_paid_orders_via_status_poll() {
    let app = TestApp::new().await;
    let order = create_order(&app, 250_00).await;

    let pending = app.orders.sync_order_status(&order.order_id).await.unwrap();
    assert_eq!(pending.status, GatewayOrderStatus::Created);

    app.gateway.set_status(ProviderPaymentStatus::Paid {
        payment_id: "pay_poll".to_string(),
        payment_method: Some("card".to_string()),
    });
    let paid = app.orders.sync_order_status(&order.order_id).await.unwrap();
    assert_eq!(paid.status, GatewayOrderStatus::Paid);
    assert_eq!(paid.settled_via, Some(SettledVia::StatusPoll));
    assert_eq!(app.balance(USER).await, 250_00);
}

#[tokio::test]
async fn test_expiry_sweep_polls_before_expiring() {
    let app = TestApp::new().await;
    let stale = create_order(&app, 200_00).await;
    let fresh = create_order(&app, 200_00).await;

    let an_hour_ago = chrono::Utc::now() - chrono::Duration::hours(1);
    orders::Entity::update_many()
        .col_expr(orders::Column::CreatedAt, Expr::value(an_hour_ago))
        .filter(orders::Column::OrderId.eq(stale.order_id.as_str()))
        .exec(&app.db)
        .await
        .unwrap();

    // 网关不可达：不能确认未付款，跳过
    app.gateway.fail_poll.store(true, Ordering::SeqCst);
    assert_eq!(
        app.orders
            .expire_stale(chrono::Duration::minutes(30))
            .await
            .unwrap(),
        0
    );

    app.gateway.fail_poll.store(false, Ordering::SeqCst);
    assert_eq!(
        app.orders
            .expire_stale(chrono::Duration::minutes(30))
            .await
            .unwrap(),
        1
    );

    let stale = app.orders.get_order(&stale.order_id, USER).await.unwrap();
    assert_eq!(stale.status, GatewayOrderStatus::Expired);
    assert_eq!(stale.settled_via, Some(SettledVia::ExpirySweep));
    let fresh = app.orders.get_order(&fresh.order_id, USER).await.unwrap();
    assert_eq!(fresh.status, GatewayOrderStatus::Created);
}

#[tokio::test]
async fn test_reused_payment_id_does_not_settle_second_order() {
    let app = TestApp::new().await;
    let first = create_order(&app, 200_00).await;
    let second = create_order(&app, 300_00).await;

    app.orders
        .confirm_from_return_path(USER, return_confirmation(&first, "pay_dup"))
        .await
        .unwrap();
    assert_eq!(app.balance(USER).await, 200_00);

    let err = app
        .orders
        .admin_mark_paid(
            &second.order_id,
            1,
            MarkPaidRequest {
                provider_payment_id: "pay_dup".to_string(),
                payment_method: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    // 订单保持 CREATED，可用正确的支付号补单
    let stored = app.orders.get_order(&second.order_id, USER).await.unwrap();
    assert_eq!(stored.status, GatewayOrderStatus::Created);
    assert_eq!(deposit_count(&app).await, 1);

    let settlement = app
        .orders
        .admin_mark_paid(
            &second.order_id,
            1,
            MarkPaidRequest {
                provider_payment_id: "pay_second".to_string(),
                payment_method: None,
            },
        )
        .await
        .unwrap();
    assert!(settlement.applied);
    assert_eq!(app.balance(USER).await, 500_00);
    app.assert_reconciled(USER).await;
}
