use chrono::Utc;
use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionCategory, TransactionStatus, Wallet,
    transactions::{self, NewEntry},
    util::new_reference,
    wallets::CounterIncrements,
};

use super::{Engine, LedgerReceipt, ledger::insert_entry, with_tx};

impl Engine {
    /// Undoes a completed entry by posting its exact inverse.
    ///
    /// The original keeps its snapshots and becomes `Reversed`; the new entry
    /// links back to it through `reversal_of`.
    pub async fn reverse(&self, transaction_id: Uuid, reason: &str) -> ResultEngine<LedgerReceipt> {
        let original = self.transaction(transaction_id).await?;
        ensure_reversible(&original)?;

        let wallet = self.wallet(&original.account_id).await?;
        wallet.ensure_usable()?;
        wallet
            .balances()
            .apply(original.delta().inverse(), original.balance_type)?;

        self.acquire_lock(wallet.id, &wallet.account_id).await?;
        let result = self.reverse_locked(&wallet, transaction_id, reason).await;
        self.release_lock(wallet.id).await;

        match &result {
            Ok(receipt) => tracing::info!(
                account_id = %wallet.account_id,
                original = %original.reference,
                reversal = %receipt.transaction_ref,
                amount_minor = receipt.amount_minor,
                "transaction reversed"
            ),
            Err(err) => tracing::warn!(
                original = %original.reference,
                error = %err,
                "reversal rejected"
            ),
        }
        result
    }

    async fn reverse_locked(
        &self,
        wallet: &Wallet,
        transaction_id: Uuid,
        reason: &str,
    ) -> ResultEngine<LedgerReceipt> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(transaction_id.to_string()))?;
            let original = Transaction::try_from(model)?;
            ensure_reversible(&original)?;

            let mut current = self.wallet_by_id(&db_tx, wallet).await?;
            let before = current.balances();
            let after = before.apply(original.delta().inverse(), original.balance_type)?;
            current.record(after, CounterIncrements::default());

            let reason = reason.trim();
            let entry = NewEntry {
                reference: new_reference("REV_"),
                kind: original.kind.inverse(),
                category: TransactionCategory::Reversal,
                balance_type: original.balance_type,
                amount_minor: original.amount_minor,
                description: if reason.is_empty() {
                    format!("Reversal of {}", original.reference)
                } else {
                    format!("Reversal of {}: {reason}", original.reference)
                },
                external_reference: Some(original.reference.clone()),
                metadata: None,
            };
            let mut reversal = Transaction::completed(
                current.id,
                current.account_id.clone(),
                entry,
                before,
                after,
            );
            reversal.reversal_of = Some(original.id);
            insert_entry(&db_tx, &reversal).await?;

            let next = original.status.transition_to(TransactionStatus::Reversed)?;
            let updated = transactions::Entity::update_many()
                .col_expr(transactions::Column::Status, Expr::value(next.as_str()))
                .col_expr(transactions::Column::ReversedAt, Expr::value(Utc::now()))
                .col_expr(
                    transactions::Column::ReversedBy,
                    Expr::value(reversal.id.to_string()),
                )
                .col_expr(transactions::Column::FailureReason, Expr::value(reason))
                .filter(transactions::Column::Id.eq(original.id.to_string()))
                .filter(transactions::Column::Status.eq(TransactionStatus::Completed.as_str()))
                .filter(transactions::Column::ReversedBy.is_null())
                .exec(&db_tx)
                .await?;
            if updated.rows_affected != 1 {
                return Err(EngineError::AlreadyReversed(original.reference));
            }

            self.store_balances(&db_tx, &current).await?;
            Ok(LedgerReceipt::for_entry(&reversal))
        })
    }
}

fn ensure_reversible(tx: &Transaction) -> ResultEngine<()> {
    if tx.is_reversal() {
        return Err(EngineError::NotReversible(tx.reference.clone()));
    }
    if tx.status == TransactionStatus::Reversed || tx.reversed_by.is_some() {
        return Err(EngineError::AlreadyReversed(tx.reference.clone()));
    }
    if tx.status != TransactionStatus::Completed {
        return Err(EngineError::NotReversible(tx.reference.clone()));
    }
    Ok(())
}
