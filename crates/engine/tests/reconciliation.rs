use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use serde_json::json;

use engine::{
    Engine, EngineError, FundingCmd, ReconcileOutcome, Transaction, TransactionStatus,
    payments::{
        ChargeRequest, CheckoutHandle, GatewayError, PaymentGateway, PaymentNotifier,
        ProviderStatus, Verification,
    },
};
use migration::MigratorTrait;

const GOOD_SIGNATURE: &str = "good-signature";

#[derive(Default)]
struct FakeGateway {
    payments: Mutex<HashMap<String, Verification>>,
    verify_calls: Mutex<usize>,
}

impl FakeGateway {
    fn settle(&self, provider_reference: &str, status: ProviderStatus, paid_minor: i64) {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments.get_mut(provider_reference).unwrap();
        payment.status = status;
        payment.amount_paid_minor = paid_minor;
    }

    fn verify_calls(&self) -> usize {
        *self.verify_calls.lock().unwrap()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn authenticate(&self) -> Result<String, GatewayError> {
        Ok("token".to_string())
    }

    async fn initiate_charge(&self, request: ChargeRequest) -> Result<CheckoutHandle, GatewayError> {
        let provider_reference = format!("GW-{}", request.payment_reference);
        self.payments.lock().unwrap().insert(
            provider_reference.clone(),
            Verification {
                status: ProviderStatus::Pending,
                payment_reference: request.payment_reference.clone(),
                provider_reference: provider_reference.clone(),
                amount_paid_minor: 0,
            },
        );
        Ok(CheckoutHandle {
            checkout_url: format!("https://checkout.test/{provider_reference}"),
            provider_reference,
            payment_reference: request.payment_reference,
        })
    }

    async fn verify_transaction(
        &self,
        provider_reference: &str,
    ) -> Result<Verification, GatewayError> {
        *self.verify_calls.lock().unwrap() += 1;
        self.payments
            .lock()
            .unwrap()
            .get(provider_reference)
            .cloned()
            .ok_or_else(|| GatewayError::Verification(format!("{provider_reference} not found")))
    }

    fn verify_webhook_signature(&self, _payload: &[u8], signature: &str) -> bool {
        signature == GOOD_SIGNATURE
    }
}

#[derive(Default)]
struct RecordingNotifier {
    completed: Mutex<Vec<String>>,
    failed: Mutex<Vec<String>>,
}

impl PaymentNotifier for RecordingNotifier {
    fn payment_completed(&self, transaction: &Transaction) {
        self.completed
            .lock()
            .unwrap()
            .push(transaction.reference.clone());
    }

    fn payment_failed(&self, transaction: &Transaction) {
        self.failed
            .lock()
            .unwrap()
            .push(transaction.reference.clone());
    }
}

struct Harness {
    engine: Engine,
    gateway: Arc<FakeGateway>,
    notifier: Arc<RecordingNotifier>,
    db: DatabaseConnection,
}

async fn harness() -> Harness {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let gateway = Arc::new(FakeGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::builder()
        .database(db.clone())
        .gateway(gateway.clone())
        .notifier(notifier.clone())
        .build()
        .await
        .unwrap();
    engine.open_account("u1", "Ada Rider").await.unwrap();
    Harness {
        engine,
        gateway,
        notifier,
        db,
    }
}

fn webhook_body(provider_reference: &str, payment_reference: &str, status: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "transactionReference": provider_reference,
        "paymentReference": payment_reference,
        "amountPaid": "50.00",
        "paymentStatus": status,
    }))
    .unwrap()
}

#[tokio::test]
async fn funding_creates_pending_entry_without_touching_balances() {
    let h = harness().await;

    let started = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 5000).description("Top up"))
        .await
        .unwrap();
    assert!(started.payment_reference.starts_with("PAY_"));
    assert_eq!(
        started.provider_reference,
        format!("GW-{}", started.payment_reference)
    );
    assert!(started.checkout_url.contains(&started.provider_reference));

    let tx = h
        .engine
        .transaction_by_reference(&started.payment_reference)
        .await
        .unwrap();
    assert_eq!(tx.id, started.transaction_id);
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.external_reference.as_deref(), Some(started.provider_reference.as_str()));
    assert_eq!(tx.before(), tx.after());

    let wallet = h.engine.wallet("u1").await.unwrap();
    assert_eq!(wallet.total_balance, 0);
}

#[tokio::test]
async fn paid_webhook_credits_once() {
    let h = harness().await;
    let started = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 5000))
        .await
        .unwrap();
    h.gateway
        .settle(&started.provider_reference, ProviderStatus::Paid, 5000);

    let body = webhook_body(&started.provider_reference, &started.payment_reference, "PAID");
    let outcome = h
        .engine
        .handle_webhook(&body, Some(GOOD_SIGNATURE))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Completed);

    let wallet = h.engine.wallet("u1").await.unwrap();
    assert_eq!(wallet.deposit_balance, 5000);
    assert_eq!(wallet.total_balance, 5000);
    assert_eq!(wallet.total_deposited, 5000);
    assert!(!wallet.is_locked);

    let tx = h.engine.transaction(started.transaction_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert!(tx.completed_at.is_some());
    assert_eq!(tx.deposit_balance_before, 0);
    assert_eq!(tx.deposit_balance_after, 5000);
    assert_eq!(tx.total_balance_after, 5000);

    // duplicate delivery
    let outcome = h
        .engine
        .handle_webhook(&body, Some(GOOD_SIGNATURE))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyProcessed);
    let outcome = h
        .engine
        .verify_payment(&started.payment_reference)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyProcessed);

    let wallet = h.engine.wallet("u1").await.unwrap();
    assert_eq!(wallet.deposit_balance, 5000);
    assert_eq!(
        h.notifier.completed.lock().unwrap().as_slice(),
        [started.payment_reference.clone()]
    );
}

#[tokio::test]
async fn bad_signature_changes_nothing() {
    let h = harness().await;
    let started = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 5000))
        .await
        .unwrap();
    h.gateway
        .settle(&started.provider_reference, ProviderStatus::Paid, 5000);
    let body = webhook_body(&started.provider_reference, &started.payment_reference, "PAID");

    let err = h
        .engine
        .handle_webhook(&body, Some("forged"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::SignatureMismatch);
    let err = h.engine.handle_webhook(&body, None).await.unwrap_err();
    assert_eq!(err, EngineError::SignatureMismatch);

    assert_eq!(h.gateway.verify_calls(), 0);
    let tx = h.engine.transaction(started.transaction_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(h.engine.wallet("u1").await.unwrap().total_balance, 0);
}

#[tokio::test]
async fn webhook_status_is_not_trusted() {
    let h = harness().await;
    let started = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 5000))
        .await
        .unwrap();

    // payload claims PAID, provider still says PENDING
    let body = webhook_body(&started.provider_reference, &started.payment_reference, "PAID");
    let outcome = h
        .engine
        .handle_webhook(&body, Some(GOOD_SIGNATURE))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::StillPending);
    assert_eq!(h.gateway.verify_calls(), 1);
    assert_eq!(h.engine.wallet("u1").await.unwrap().total_balance, 0);
}

#[tokio::test]
async fn failed_payment_marks_entry_failed() {
    let h = harness().await;
    let started = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 5000))
        .await
        .unwrap();
    h.gateway
        .settle(&started.provider_reference, ProviderStatus::Expired, 0);

    let outcome = h
        .engine
        .verify_payment(&started.payment_reference)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Failed);

    let tx = h.engine.transaction(started.transaction_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Failed);
    assert!(tx.failure_reason.is_some());
    assert_eq!(h.engine.wallet("u1").await.unwrap().total_balance, 0);
    assert_eq!(h.notifier.failed.lock().unwrap().len(), 1);

    // a late success for a failed entry is ignored
    h.gateway
        .settle(&started.provider_reference, ProviderStatus::Paid, 5000);
    let body = webhook_body(&started.provider_reference, &started.payment_reference, "PAID");
    let outcome = h
        .engine
        .handle_webhook(&body, Some(GOOD_SIGNATURE))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(h.engine.wallet("u1").await.unwrap().total_balance, 0);
}

#[tokio::test]
async fn amount_mismatch_credits_recorded_amount() {
    let h = harness().await;
    let started = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 5000))
        .await
        .unwrap();
    h.gateway
        .settle(&started.provider_reference, ProviderStatus::Paid, 4900);

    let outcome = h
        .engine
        .verify_payment(&started.payment_reference)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Completed);
    assert_eq!(h.engine.wallet("u1").await.unwrap().deposit_balance, 5000);
}

#[tokio::test]
async fn locked_wallet_leaves_payment_pending() {
    let h = harness().await;
    let started = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 5000))
        .await
        .unwrap();
    h.gateway
        .settle(&started.provider_reference, ProviderStatus::Paid, 5000);
    h.db.execute_unprepared("UPDATE wallets SET is_locked = 1 WHERE account_id = 'u1'")
        .await
        .unwrap();

    let body = webhook_body(&started.provider_reference, &started.payment_reference, "PAID");
    let err = h
        .engine
        .handle_webhook(&body, Some(GOOD_SIGNATURE))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::WalletLocked("u1".to_string()));

    let err = h
        .engine
        .verify_payment(&started.payment_reference)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::WalletLocked("u1".to_string()));

    let tx = h
        .engine
        .transaction_by_reference(&started.payment_reference)
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    let wallet = h.engine.wallet("u1").await.unwrap();
    assert_eq!(wallet.total_balance, 0);
    assert_eq!(wallet.total_deposited, 0);
    assert!(h.notifier.completed.lock().unwrap().is_empty());

    h.db.execute_unprepared("UPDATE wallets SET is_locked = 0 WHERE account_id = 'u1'")
        .await
        .unwrap();
    let outcome = h
        .engine
        .handle_webhook(&body, Some(GOOD_SIGNATURE))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Completed);
    assert_eq!(h.engine.wallet("u1").await.unwrap().deposit_balance, 5000);
}

#[tokio::test]
async fn unknown_reference_is_a_no_op() {
    let h = harness().await;
    let started = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 5000))
        .await
        .unwrap();
    // provider knows a payment whose reference the ledger never issued
    {
        let mut payments = h.gateway.payments.lock().unwrap();
        let payment = payments.get_mut(&started.provider_reference).unwrap();
        payment.payment_reference = "PAY_UNKNOWN".to_string();
        payment.status = ProviderStatus::Paid;
    }
    let body = webhook_body(&started.provider_reference, "PAY_UNKNOWN", "PAID");
    let outcome = h
        .engine
        .handle_webhook(&body, Some(GOOD_SIGNATURE))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Unknown);
    assert_eq!(h.engine.wallet("u1").await.unwrap().total_balance, 0);
}

#[tokio::test]
async fn malformed_payload_is_rejected_after_signature_check() {
    let h = harness().await;
    let err = h
        .engine
        .handle_webhook(b"{\"hello\":1}", Some(GOOD_SIGNATURE))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPayload(_)));
}

#[tokio::test]
async fn stale_sweep_settles_pending_entries() {
    let h = harness().await;
    let paid = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 1000))
        .await
        .unwrap();
    let expired = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 2000))
        .await
        .unwrap();
    let _waiting = h
        .engine
        .initiate_funding(FundingCmd::new("u1", 3000))
        .await
        .unwrap();
    h.gateway
        .settle(&paid.provider_reference, ProviderStatus::Paid, 1000);
    h.gateway
        .settle(&expired.provider_reference, ProviderStatus::Expired, 0);

    let report = h
        .engine
        .reconcile_stale_pending(chrono::Duration::zero())
        .await
        .unwrap();
    assert_eq!(report.checked, 3);
    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.still_pending, 1);
    assert_eq!(report.errors, 0);

    assert_eq!(h.engine.wallet("u1").await.unwrap().deposit_balance, 1000);

    let again = h
        .engine
        .reconcile_stale_pending(chrono::Duration::zero())
        .await
        .unwrap();
    assert_eq!(again.checked, 1);
    assert_eq!(h.engine.wallet("u1").await.unwrap().deposit_balance, 1000);
}

#[tokio::test]
async fn funding_without_gateway_is_unavailable() {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    engine.open_account("u1", "Ada").await.unwrap();

    let err = engine
        .initiate_funding(FundingCmd::new("u1", 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::GatewayUnavailable(_)));
    assert_eq!(err.to_string(), "payment service unavailable");

    let err = engine
        .initiate_funding(FundingCmd::new("u1", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}
