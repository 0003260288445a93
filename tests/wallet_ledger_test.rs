mod common;

use common::*;
use futures_util::future::join_all;
use wallet_core::entities::{EntryStatus, EntryType};
use wallet_core::error::AppError;
use wallet_core::models::{EntryMetadata, TransactionQuery};
use wallet_core::services::DeltaRequest;

fn query() -> TransactionQuery {
    TransactionQuery {
        page: None,
        per_page: None,
        entry_type: None,
        status: None,
        from: None,
        to: None,
    }
}

#[tokio::test]
async fn test_deposit_withdraw_then_insufficient() {
    let app = TestApp::new().await;

    let deposit = app
        .wallets
        .apply_delta(DeltaRequest::new(1, 500, EntryType::Deposit).reference("dep-1"))
        .await
        .unwrap();
    assert_eq!(deposit.balance_after, Some(500));
    assert_eq!(deposit.status, EntryStatus::Completed);

    let withdrawal = app
        .wallets
        .apply_delta(DeltaRequest::new(1, 500, EntryType::Withdrawal).reference("wd-1"))
        .await
        .unwrap();
    assert_eq!(withdrawal.balance_after, Some(0));

    let err = app
        .wallets
        .apply_delta(DeltaRequest::new(1, 1, EntryType::Withdrawal).reference("wd-2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientBalance));

    assert_eq!(app.balance(1).await, 0);
    let listed = app.ledger.list_entries(1, &query()).await.unwrap();
    assert_eq!(listed.total, 2);
    app.assert_reconciled(1).await;
}

#[tokio::test]
async fn test_replayed_reference_returns_existing_entry() {
    let app = TestApp::new().await;

    let first = app
        .wallets
        .apply_delta(DeltaRequest::new(7, 1_000, EntryType::Deposit).reference("utr-42"))
        .await
        .unwrap();
    let second = app
        .wallets
        .apply_delta(DeltaRequest::new(7, 1_000, EntryType::Deposit).reference("utr-42"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(app.balance(7).await, 1_000);

    // 同一引用可用于不同类型
    app.wallets
        .apply_delta(DeltaRequest::new(7, 300, EntryType::Withdrawal).reference("utr-42"))
        .await
        .unwrap();
    assert_eq!(app.balance(7).await, 700);
}

#[tokio::test]
async fn test_rejects_non_positive_amount() {
    let app = TestApp::new().await;

    let err = app
        .wallets
        .apply_delta(DeltaRequest::new(1, 0, EntryType::Deposit))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(app.ledger.get_wallet(1).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deltas_reconcile() {
    let app = TestApp::new().await;
    app.fund(3, 1_000).await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let wallets = app.wallets.clone();
        tasks.push(tokio::spawn(async move {
            let req = if i % 2 == 0 {
                DeltaRequest::new(3, 100, EntryType::Deposit).reference(format!("c-dep-{i}"))
            } else {
                DeltaRequest::new(3, 150, EntryType::Withdrawal).reference(format!("c-wd-{i}"))
            };
            wallets.apply_delta(req).await
        }));
    }

    let mut succeeded = 0;
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientBalance) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(succeeded >= 10);

    let balance = app.balance(3).await;
    assert!(balance >= 0);
    app.assert_reconciled(3).await;
    assert!(app.ledger.reconcile_all().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_replays_apply_once() {
    let app = TestApp::new().await;

    let tasks = (0..8).map(|_| {
        let wallets = app.wallets.clone();
        tokio::spawn(async move {
            wallets
                .apply_delta(DeltaRequest::new(9, 2_500, EntryType::Deposit).reference("pay_dup"))
                .await
        })
    });
    let ids: Vec<i64> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().id)
        .collect();

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(app.balance(9).await, 2_500);
}

#[tokio::test]
async fn test_list_entries_filters_and_metadata() {
    let app = TestApp::new().await;
    app.fund(4, 10_000).await;
    app.wallets
        .apply_delta(
            DeltaRequest::new(4, 2_000, EntryType::SchemePayment)
                .reference("scheme-1")
                .metadata(EntryMetadata::Commission {
                    domain_txn_id: "scheme-1".to_string(),
                }),
        )
        .await
        .unwrap();

    let mut q = query();
    q.entry_type = Some(EntryType::SchemePayment);
    let page = app.ledger.list_entries(4, &q).await.unwrap();
    assert_eq!(page.total, 1);
    let entry = &page.data[0];
    assert_eq!(entry.balance_after, Some(8_000));
    let metadata = entry.metadata.as_ref().unwrap();
    assert!(matches!(
        EntryMetadata::from_json(metadata),
        Some(EntryMetadata::Commission { .. })
    ));

    // 其他用户看不到
    assert_eq!(app.ledger.list_entries(5, &query()).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_get_wallet_without_activity_is_empty() {
    let app = TestApp::new().await;
    let wallet = app.wallets.get_wallet(11).await.unwrap();
    assert_eq!(wallet.balance, 0);
    assert_eq!(wallet.user_id, 11);
}
