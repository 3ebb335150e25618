//! Credit, debit and refund.
//!
//! Every mutation follows the same shape: validate, check sufficiency on a
//! plain read, take the wallet lock, re-read and re-check inside a DB
//! transaction, write the entry and the wallet together, release the lock.

use sea_orm::{ConnectionTrait, SqlErr, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    BalanceType, Balances, CreditCmd, DebitCmd, EngineError, EntryMeta, RefundCmd, ResultEngine,
    Transaction, TransactionCategory, TransactionKind, Wallet,
    balances::{credit_delta, debit_delta},
    transactions::{self, NewEntry},
    util::{ensure_positive, new_reference, normalize_optional_text},
    wallets::CounterIncrements,
};

use super::{Engine, with_tx};

/// Result of a completed balance mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerReceipt {
    pub success: bool,
    pub transaction_id: Uuid,
    pub transaction_ref: String,
    pub previous_balances: Balances,
    pub new_balances: Balances,
    pub amount_minor: i64,
    pub balance_type: BalanceType,
}

impl LedgerReceipt {
    pub(super) fn for_entry(tx: &Transaction) -> Self {
        Self {
            success: true,
            transaction_id: tx.id,
            transaction_ref: tx.reference.clone(),
            previous_balances: tx.before(),
            new_balances: tx.after(),
            amount_minor: tx.amount_minor,
            balance_type: tx.balance_type,
        }
    }
}

impl Engine {
    /// Adds funds to the wallet of `cmd.account_id`.
    pub async fn credit(&self, cmd: CreditCmd) -> ResultEngine<LedgerReceipt> {
        self.post(
            &cmd.account_id,
            TransactionKind::Credit,
            cmd.category,
            cmd.balance_type,
            cmd.amount_minor,
            cmd.meta,
        )
        .await
    }

    /// Removes funds from the wallet of `cmd.account_id`.
    ///
    /// `Both` draws from the deposit balance first.
    pub async fn debit(&self, cmd: DebitCmd) -> ResultEngine<LedgerReceipt> {
        self.post(
            &cmd.account_id,
            TransactionKind::Debit,
            cmd.category,
            cmd.balance_type,
            cmd.amount_minor,
            cmd.meta,
        )
        .await
    }

    /// Credits a refund. Refunds never check balances.
    pub async fn refund(&self, cmd: RefundCmd) -> ResultEngine<LedgerReceipt> {
        let meta = EntryMeta::default()
            .description(format!("Refund: {}", cmd.reason.trim()))
            .external_reference(cmd.original_reference);
        self.post(
            &cmd.account_id,
            TransactionKind::Credit,
            TransactionCategory::Refund,
            cmd.balance_type,
            cmd.amount_minor,
            meta,
        )
        .await
    }

    async fn post(
        &self,
        account_id: &str,
        kind: TransactionKind,
        category: TransactionCategory,
        balance_type: BalanceType,
        amount_minor: i64,
        meta: EntryMeta,
    ) -> ResultEngine<LedgerReceipt> {
        ensure_positive(amount_minor)?;
        if category == TransactionCategory::Reversal {
            return Err(EngineError::InvalidCategory(
                "reversal entries are created by reverse only".to_string(),
            ));
        }

        let wallet = self.wallet(account_id).await?;
        wallet.ensure_usable()?;
        if kind == TransactionKind::Debit {
            debit_delta(wallet.balances(), amount_minor, balance_type)?;
        }

        let entry = NewEntry {
            reference: meta
                .reference
                .as_deref()
                .and_then(|r| normalize_optional_text(Some(r)))
                .unwrap_or_else(|| new_reference("TXN_")),
            kind,
            category,
            balance_type,
            amount_minor,
            description: meta
                .description
                .as_deref()
                .and_then(|d| normalize_optional_text(Some(d)))
                .unwrap_or_else(|| default_description(kind, category)),
            external_reference: meta.external_reference,
            metadata: meta.metadata,
        };

        self.acquire_lock(wallet.id, &wallet.account_id).await?;
        let result = self.apply_locked(&wallet, entry).await;
        self.release_lock(wallet.id).await;

        match &result {
            Ok(receipt) => tracing::info!(
                %account_id,
                reference = %receipt.transaction_ref,
                kind = kind.as_str(),
                category = category.as_str(),
                amount_minor,
                "ledger entry posted"
            ),
            Err(err) => tracing::warn!(
                %account_id,
                kind = kind.as_str(),
                amount_minor,
                error = %err,
                "ledger entry rejected"
            ),
        }
        result
    }

    /// Body of a mutation. Must only run while holding the wallet lock.
    async fn apply_locked(&self, wallet: &Wallet, entry: NewEntry) -> ResultEngine<LedgerReceipt> {
        with_tx!(self, |db_tx| {
            let mut current = self.wallet_by_id(&db_tx, wallet).await?;
            let before = current.balances();
            let delta = match entry.kind {
                TransactionKind::Credit => {
                    credit_delta(entry.amount_minor, entry.balance_type, self.both_split)
                }
                TransactionKind::Debit => {
                    debit_delta(before, entry.amount_minor, entry.balance_type)?
                }
            };
            let after = before.apply(delta, entry.balance_type)?;
            current.record(
                after,
                CounterIncrements::for_entry(entry.kind, entry.category, entry.amount_minor),
            );

            let tx = Transaction::completed(
                current.id,
                current.account_id.clone(),
                entry,
                before,
                after,
            );
            insert_entry(&db_tx, &tx).await?;
            self.store_balances(&db_tx, &current).await?;
            Ok(LedgerReceipt::for_entry(&tx))
        })
    }
}

/// Inserts a ledger entry, reporting a duplicate reference as `ExistingKey`.
pub(super) async fn insert_entry<C: ConnectionTrait>(db: &C, tx: &Transaction) -> ResultEngine<()> {
    match transactions::ActiveModel::from(tx).insert(db).await {
        Ok(_) => Ok(()),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(EngineError::ExistingKey(tx.reference.clone()))
        }
        Err(err) => Err(err.into()),
    }
}

fn default_description(kind: TransactionKind, category: TransactionCategory) -> String {
    let label = category.as_str().replace('_', " ");
    match kind {
        TransactionKind::Credit => format!("Credit: {label}"),
        TransactionKind::Debit => format!("Debit: {label}"),
    }
}
