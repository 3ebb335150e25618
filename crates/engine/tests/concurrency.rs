use std::sync::Arc;

use sea_orm::{ConnectOptions, Database};

use engine::{BalanceType, CreditCmd, DebitCmd, Engine, EngineError, TransactionCategory};
use migration::MigratorTrait;

async fn engine_with_funds(withdrawable: i64) -> Engine {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    engine.open_account("u1", "Ada Rider").await.unwrap();
    engine
        .credit(CreditCmd::new(
            "u1",
            withdrawable,
            TransactionCategory::Commission,
            BalanceType::Withdrawable,
        ))
        .await
        .unwrap();
    engine
}

fn payout(amount_minor: i64) -> DebitCmd {
    DebitCmd::new(
        "u1",
        amount_minor,
        TransactionCategory::Payout,
        BalanceType::Withdrawable,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_debits_never_overdraw() {
    let engine = Arc::new(engine_with_funds(100).await);

    let a = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.debit(payout(60)).await }
    });
    let b = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.debit(payout(60)).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "results: {results:?}");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                err,
                EngineError::WalletLocked(_) | EngineError::InsufficientBalance { .. }
            ),
            "unexpected error: {err:?}"
        );
    }

    let wallet = engine.wallet("u1").await.unwrap();
    assert_eq!(wallet.withdrawable_balance, 40);
    assert_eq!(wallet.total_balance, 40);
    assert!(!wallet.is_locked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_debits_keep_balance_consistent() {
    let engine = Arc::new(engine_with_funds(1000).await);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move { engine.debit(payout(150)).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    let wallet = engine.wallet("u1").await.unwrap();
    assert!(succeeded <= 6);
    assert_eq!(wallet.withdrawable_balance, 1000 - succeeded * 150);
    assert!(wallet.withdrawable_balance >= 0);
    assert_eq!(
        wallet.total_balance,
        wallet.deposit_balance + wallet.withdrawable_balance
    );
    assert!(!wallet.is_locked);
}
