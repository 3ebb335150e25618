//! Settling PENDING funding entries from the provider's verdict.
//!
//! A payment is only ever credited after `verify_transaction` says it is
//! paid; webhook bodies are used for their references alone. Completion is a
//! conditional `pending -> completed` UPDATE inside the locked section, so a
//! duplicate webhook or a concurrent poll cannot credit twice.

use chrono::{Duration, Utc};
use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionStatus, Wallet,
    balances::credit_delta,
    payments::{PaymentOutcome, Verification, WebhookPayload},
    transactions,
    wallets::CounterIncrements,
};

use super::{Engine, with_tx};

/// What reconciliation did with a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The pending entry was completed and the wallet credited.
    Completed,
    /// The pending entry was marked failed.
    Failed,
    /// The provider has not settled the payment yet.
    StillPending,
    /// The entry was already completed.
    AlreadyProcessed,
    /// No entry carries this payment reference.
    Unknown,
    /// The entry is failed or reversed; nothing to do.
    Ignored,
}

/// Totals of one [`Engine::reconcile_stale_pending`] sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub completed: usize,
    pub failed: usize,
    pub still_pending: usize,
    pub errors: usize,
}

impl Engine {
    /// Processes a provider webhook.
    ///
    /// Fails with `SignatureMismatch` before reading the body when the
    /// signature is missing or wrong.
    pub async fn handle_webhook(
        &self,
        raw_payload: &[u8],
        signature: Option<&str>,
    ) -> ResultEngine<ReconcileOutcome> {
        let gateway = self.gateway()?;
        let signed = signature
            .map(|sig| gateway.verify_webhook_signature(raw_payload, sig))
            .unwrap_or(false);
        if !signed {
            tracing::warn!(
                has_signature = signature.is_some(),
                "webhook rejected: signature mismatch"
            );
            return Err(EngineError::SignatureMismatch);
        }

        let payload = WebhookPayload::parse(raw_payload)?;
        tracing::info!(
            payment_reference = %payload.payment_reference,
            provider_reference = %payload.transaction_reference,
            claimed_status = payload.payment_status.as_deref().unwrap_or("-"),
            "webhook received"
        );

        let verification = self.verify_with_provider(&payload.transaction_reference).await?;
        if verification.payment_reference != payload.payment_reference {
            tracing::warn!(
                webhook = %payload.payment_reference,
                verified = %verification.payment_reference,
                "webhook payment reference differs from provider record"
            );
        }
        self.apply_verification(&verification).await
    }

    /// Polls the provider for one pending funding entry.
    pub async fn verify_payment(&self, payment_reference: &str) -> ResultEngine<ReconcileOutcome> {
        let tx = self.transaction_by_reference(payment_reference).await?;
        match tx.status {
            TransactionStatus::Pending => {}
            TransactionStatus::Completed => return Ok(ReconcileOutcome::AlreadyProcessed),
            TransactionStatus::Failed | TransactionStatus::Reversed => {
                return Ok(ReconcileOutcome::Ignored);
            }
        }
        let provider_reference = tx.external_reference.as_deref().ok_or_else(|| {
            EngineError::InvalidTransactionState(format!(
                "{} has no provider reference",
                tx.reference
            ))
        })?;

        let verification = self.verify_with_provider(provider_reference).await?;
        self.apply_verification(&verification).await
    }

    /// Verifies every PENDING funding entry older than `older_than`.
    ///
    /// Errors on single entries are logged and counted, never propagated.
    pub async fn reconcile_stale_pending(&self, older_than: Duration) -> ResultEngine<ReconcileReport> {
        let cutoff = Utc::now() - older_than;
        let pending = self.pending_before(cutoff).await?;

        let mut report = ReconcileReport::default();
        for tx in pending.iter().filter(|tx| tx.external_reference.is_some()) {
            report.checked += 1;
            match self.verify_payment(&tx.reference).await {
                Ok(ReconcileOutcome::Completed) => report.completed += 1,
                Ok(ReconcileOutcome::Failed) => report.failed += 1,
                Ok(ReconcileOutcome::StillPending) => report.still_pending += 1,
                Ok(_) => {}
                Err(err) => {
                    report.errors += 1;
                    tracing::warn!(
                        reference = %tx.reference,
                        error = %err,
                        detail = err.gateway_detail().unwrap_or(""),
                        "stale payment verification failed"
                    );
                }
            }
        }

        if report.checked > 0 {
            tracing::info!(
                checked = report.checked,
                completed = report.completed,
                failed = report.failed,
                still_pending = report.still_pending,
                errors = report.errors,
                "stale payments reconciled"
            );
        }
        Ok(report)
    }

    async fn verify_with_provider(&self, provider_reference: &str) -> ResultEngine<Verification> {
        let gateway = self.gateway()?;
        gateway
            .verify_transaction(provider_reference)
            .await
            .map_err(|err| {
                tracing::error!(%provider_reference, error = %err, "payment verification failed");
                EngineError::from(err)
            })
    }

    async fn apply_verification(&self, verification: &Verification) -> ResultEngine<ReconcileOutcome> {
        let reference = verification.payment_reference.as_str();
        let tx = match self.transaction_by_reference(reference).await {
            Ok(tx) => tx,
            Err(EngineError::KeyNotFound(_)) => {
                tracing::warn!(payment_reference = %reference, "payment for unknown reference");
                return Ok(ReconcileOutcome::Unknown);
            }
            Err(err) => return Err(err),
        };

        match tx.status {
            TransactionStatus::Pending => {}
            TransactionStatus::Completed => {
                tracing::info!(payment_reference = %reference, "payment already processed");
                return Ok(ReconcileOutcome::AlreadyProcessed);
            }
            TransactionStatus::Failed | TransactionStatus::Reversed => {
                tracing::warn!(
                    payment_reference = %reference,
                    status = tx.status.as_str(),
                    provider_status = ?verification.status,
                    "payment update for settled entry ignored"
                );
                return Ok(ReconcileOutcome::Ignored);
            }
        }

        match verification.status.outcome() {
            PaymentOutcome::Pending => Ok(ReconcileOutcome::StillPending),
            PaymentOutcome::Success => {
                if verification.amount_paid_minor != tx.amount_minor {
                    tracing::warn!(
                        payment_reference = %reference,
                        recorded = tx.amount_minor,
                        paid = verification.amount_paid_minor,
                        "paid amount differs from recorded amount, crediting recorded amount"
                    );
                }
                self.complete_pending(&tx).await
            }
            PaymentOutcome::Failed => {
                let reason = format!("payment {:?}", verification.status).to_lowercase();
                self.fail_pending(&tx, &reason).await
            }
        }
    }

    async fn complete_pending(&self, tx: &Transaction) -> ResultEngine<ReconcileOutcome> {
        let next = tx.status.transition_to(TransactionStatus::Completed)?;
        let wallet = self.wallet(&tx.account_id).await?;

        self.acquire_lock(wallet.id, &wallet.account_id).await?;
        let result = self.complete_locked(&wallet, tx, next).await;
        self.release_lock(wallet.id).await;

        if matches!(result, Ok(ReconcileOutcome::Completed)) {
            let completed = self.transaction(tx.id).await?;
            tracing::info!(
                account_id = %completed.account_id,
                reference = %completed.reference,
                amount_minor = completed.amount_minor,
                "payment completed"
            );
            self.notifier.payment_completed(&completed);
        }
        result
    }

    async fn complete_locked(
        &self,
        wallet: &Wallet,
        tx: &Transaction,
        next: TransactionStatus,
    ) -> ResultEngine<ReconcileOutcome> {
        with_tx!(self, |db_tx| {
            let mut current = self.wallet_by_id(&db_tx, wallet).await?;
            let before = current.balances();
            let delta = credit_delta(tx.amount_minor, tx.balance_type, self.both_split);
            let after = before.apply(delta, tx.balance_type)?;
            current.record(
                after,
                CounterIncrements::for_entry(tx.kind, tx.category, tx.amount_minor),
            );

            let updated = transactions::Entity::update_many()
                .col_expr(transactions::Column::Status, Expr::value(next.as_str()))
                .col_expr(transactions::Column::CompletedAt, Expr::value(Utc::now()))
                .col_expr(transactions::Column::DepositBalanceBefore, Expr::value(before.deposit))
                .col_expr(transactions::Column::DepositBalanceAfter, Expr::value(after.deposit))
                .col_expr(
                    transactions::Column::WithdrawableBalanceBefore,
                    Expr::value(before.withdrawable),
                )
                .col_expr(
                    transactions::Column::WithdrawableBalanceAfter,
                    Expr::value(after.withdrawable),
                )
                .col_expr(transactions::Column::TotalBalanceBefore, Expr::value(before.total))
                .col_expr(transactions::Column::TotalBalanceAfter, Expr::value(after.total))
                .filter(transactions::Column::Id.eq(tx.id.to_string()))
                .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected != 1 {
                return Ok(ReconcileOutcome::AlreadyProcessed);
            }

            self.store_balances(&db_tx, &current).await?;
            Ok(ReconcileOutcome::Completed)
        })
    }

    async fn fail_pending(&self, tx: &Transaction, reason: &str) -> ResultEngine<ReconcileOutcome> {
        let next = tx.status.transition_to(TransactionStatus::Failed)?;
        let updated = transactions::Entity::update_many()
            .col_expr(transactions::Column::Status, Expr::value(next.as_str()))
            .col_expr(transactions::Column::FailureReason, Expr::value(reason))
            .filter(transactions::Column::Id.eq(tx.id.to_string()))
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
            .exec(&self.database)
            .await?;
        if updated.rows_affected != 1 {
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        let failed = self.transaction(tx.id).await?;
        tracing::info!(reference = %failed.reference, %reason, "payment failed");
        self.notifier.payment_failed(&failed);
        Ok(ReconcileOutcome::Failed)
    }
}
