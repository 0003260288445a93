mod common;

use common::*;
use wallet_core::entities::{WalletRequestStatus, WalletRequestType};
use wallet_core::error::AppError;
use wallet_core::external::Notification;
use wallet_core::models::{
    DecideWalletRequest, Decision, SubmitWalletRequest, WalletRequestQuery,
};

fn submission(request_type: WalletRequestType, amount: i64, utr: Option<&str>) -> SubmitWalletRequest {
    SubmitWalletRequest {
        request_type,
        amount,
        payment_method: Some("bank_transfer".to_string()),
        transaction_reference: utr.map(str::to_string),
        evidence_url: None,
        remarks: None,
        metadata: None,
    }
}

fn decision(outcome: Decision) -> DecideWalletRequest {
    DecideWalletRequest {
        outcome,
        remarks: Some("checked".to_string()),
    }
}

#[tokio::test]
async fn test_topup_approval_credits_wallet() {
    let app = TestApp::new().await;

    let request = app
        .requests
        .submit(31, submission(WalletRequestType::Topup, 1_000_00, Some("UTR1001")))
        .await
        .unwrap();
    assert_eq!(request.status, WalletRequestStatus::Pending);

    let decided = app
        .requests
        .decide(request.id, 900, decision(Decision::Approved))
        .await
        .unwrap();
    assert_eq!(decided.status, WalletRequestStatus::Approved);
    assert_eq!(decided.approver_id, Some(900));
    assert!(decided.entry_id.is_some());
    assert!(decided.decided_at.is_some());
    assert_eq!(app.balance(31).await, 1_000_00);

    // 已决策的申请不能再次审批
    let err = app
        .requests
        .decide(request.id, 900, decision(Decision::Approved))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
    assert_eq!(app.balance(31).await, 1_000_00);
    app.assert_reconciled(31).await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(app.notifier.sent().iter().any(|n| matches!(
        n,
        Notification::WalletRequestDecided {
            status: WalletRequestStatus::Approved,
            ..
        }
    )));
}

#[tokio::test]
async fn test_withdrawal_approval_with_insufficient_funds_stays_pending() {
    let app = TestApp::new().await;
    app.fund(32, 800_00).await;

    let request = app
        .requests
        .submit(32, submission(WalletRequestType::Withdrawal, 700_00, None))
        .await
        .unwrap();

    // 提交之后余额被其他交易消耗
    app.wallets
        .apply_delta(
            wallet_core::services::DeltaRequest::new(
                32,
                500_00,
                wallet_core::entities::EntryType::SchemePayment,
            )
            .reference("scheme-32"),
        )
        .await
        .unwrap();

    let err = app
        .requests
        .decide(request.id, 900, decision(Decision::Approved))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientBalance));

    let stored = app.requests.get(request.id).await.unwrap();
    assert_eq!(stored.status, WalletRequestStatus::Pending);
    assert!(stored.approver_id.is_none());
    assert!(stored.entry_id.is_none());
    assert_eq!(app.balance(32).await, 300_00);
    app.assert_reconciled(32).await;
}

#[tokio::test]
async fn test_withdrawal_submission_checks_balance() {
    let app = TestApp::new().await;
    app.fund(33, 600_00).await;

    let err = app
        .requests
        .submit(33, submission(WalletRequestType::Withdrawal, 700_00, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientBalance));

    let request = app
        .requests
        .submit(33, submission(WalletRequestType::Withdrawal, 600_00, None))
        .await
        .unwrap();
    app.requests
        .decide(request.id, 900, decision(Decision::Approved))
        .await
        .unwrap();
    assert_eq!(app.balance(33).await, 0);
}

#[tokio::test]
async fn test_rejection_leaves_balance_untouched() {
    let app = TestApp::new().await;
    let request = app
        .requests
        .submit(34, submission(WalletRequestType::Topup, 200_00, None))
        .await
        .unwrap();

    let decided = app
        .requests
        .decide(request.id, 901, decision(Decision::Rejected))
        .await
        .unwrap();
    assert_eq!(decided.status, WalletRequestStatus::Rejected);
    assert_eq!(decided.remarks.as_deref(), Some("checked"));
    assert!(decided.entry_id.is_none());
    assert_eq!(app.balance(34).await, 0);
}

#[tokio::test]
async fn test_duplicate_utr_is_rejected() {
    let app = TestApp::new().await;
    app.requests
        .submit(35, submission(WalletRequestType::Topup, 200_00, Some("UTR777")))
        .await
        .unwrap();

    let err = app
        .requests
        .submit(36, submission(WalletRequestType::Topup, 200_00, Some(" UTR777 ")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_amount_limits() {
    let app = TestApp::new().await;
    let err = app
        .requests
        .submit(37, submission(WalletRequestType::Topup, 50, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let err = app
        .requests
        .decide(12345, 900, decision(Decision::Approved))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = TestApp::new().await;
    let first = app
        .requests
        .submit(38, submission(WalletRequestType::Topup, 200_00, None))
        .await
        .unwrap();
    app.requests
        .submit(38, submission(WalletRequestType::Topup, 300_00, None))
        .await
        .unwrap();
    app.requests
        .decide(first.id, 900, decision(Decision::Rejected))
        .await
        .unwrap();

    let pending = app
        .requests
        .list(&WalletRequestQuery {
            page: None,
            per_page: None,
            status: Some(WalletRequestStatus::Pending),
            request_type: None,
            user_id: Some(38),
        })
        .await
        .unwrap();
    assert_eq!(pending.total, 1);
    assert_eq!(pending.data[0].amount, 300_00);
}
