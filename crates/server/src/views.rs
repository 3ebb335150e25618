//! Conversions between engine types and the JSON views in `api_types`.

use api_types::{
    Balances as ApiBalances, BalanceType as ApiBalanceType,
    payment::ReconcileOutcome as ApiOutcome,
    transaction::{
        TransactionCategory as ApiCategory, TransactionKind as ApiKind,
        TransactionStatus as ApiStatus, TransactionView,
    },
    wallet::{LedgerReceipt, WalletView},
};
use engine::{
    BalanceType, Balances, Money, ReconcileOutcome, Transaction, TransactionCategory,
    TransactionKind, TransactionStatus, Wallet,
};

pub(crate) fn balances(value: Balances) -> ApiBalances {
    ApiBalances {
        deposit_minor: value.deposit,
        withdrawable_minor: value.withdrawable,
        total_minor: value.total,
    }
}

pub(crate) fn balance_type(value: BalanceType) -> ApiBalanceType {
    match value {
        BalanceType::Deposit => ApiBalanceType::Deposit,
        BalanceType::Withdrawable => ApiBalanceType::Withdrawable,
        BalanceType::Both => ApiBalanceType::Both,
    }
}

pub(crate) fn engine_balance_type(value: ApiBalanceType) -> BalanceType {
    match value {
        ApiBalanceType::Deposit => BalanceType::Deposit,
        ApiBalanceType::Withdrawable => BalanceType::Withdrawable,
        ApiBalanceType::Both => BalanceType::Both,
    }
}

fn kind(value: TransactionKind) -> ApiKind {
    match value {
        TransactionKind::Credit => ApiKind::Credit,
        TransactionKind::Debit => ApiKind::Debit,
    }
}

pub(crate) fn engine_kind(value: ApiKind) -> TransactionKind {
    match value {
        ApiKind::Credit => TransactionKind::Credit,
        ApiKind::Debit => TransactionKind::Debit,
    }
}

fn category(value: TransactionCategory) -> ApiCategory {
    match value {
        TransactionCategory::Deposit => ApiCategory::Deposit,
        TransactionCategory::Withdrawal => ApiCategory::Withdrawal,
        TransactionCategory::Refund => ApiCategory::Refund,
        TransactionCategory::Adjustment => ApiCategory::Adjustment,
        TransactionCategory::DeliveryPayment => ApiCategory::DeliveryPayment,
        TransactionCategory::Commission => ApiCategory::Commission,
        TransactionCategory::Winnings => ApiCategory::Winnings,
        TransactionCategory::Payout => ApiCategory::Payout,
        TransactionCategory::Reversal => ApiCategory::Reversal,
    }
}

pub(crate) fn engine_category(value: ApiCategory) -> TransactionCategory {
    match value {
        ApiCategory::Deposit => TransactionCategory::Deposit,
        ApiCategory::Withdrawal => TransactionCategory::Withdrawal,
        ApiCategory::Refund => TransactionCategory::Refund,
        ApiCategory::Adjustment => TransactionCategory::Adjustment,
        ApiCategory::DeliveryPayment => TransactionCategory::DeliveryPayment,
        ApiCategory::Commission => TransactionCategory::Commission,
        ApiCategory::Winnings => TransactionCategory::Winnings,
        ApiCategory::Payout => TransactionCategory::Payout,
        ApiCategory::Reversal => TransactionCategory::Reversal,
    }
}

fn status(value: TransactionStatus) -> ApiStatus {
    match value {
        TransactionStatus::Pending => ApiStatus::Pending,
        TransactionStatus::Completed => ApiStatus::Completed,
        TransactionStatus::Failed => ApiStatus::Failed,
        TransactionStatus::Reversed => ApiStatus::Reversed,
    }
}

pub(crate) fn engine_status(value: ApiStatus) -> TransactionStatus {
    match value {
        ApiStatus::Pending => TransactionStatus::Pending,
        ApiStatus::Completed => TransactionStatus::Completed,
        ApiStatus::Failed => TransactionStatus::Failed,
        ApiStatus::Reversed => TransactionStatus::Reversed,
    }
}

pub(crate) fn outcome(value: ReconcileOutcome) -> ApiOutcome {
    match value {
        ReconcileOutcome::Completed => ApiOutcome::Completed,
        ReconcileOutcome::Failed => ApiOutcome::Failed,
        ReconcileOutcome::StillPending => ApiOutcome::StillPending,
        ReconcileOutcome::AlreadyProcessed => ApiOutcome::AlreadyProcessed,
        ReconcileOutcome::Unknown => ApiOutcome::Unknown,
        ReconcileOutcome::Ignored => ApiOutcome::Ignored,
    }
}

pub(crate) fn wallet(wallet: Wallet) -> WalletView {
    WalletView {
        id: wallet.id,
        balances: balances(wallet.balances()),
        display_total: Money::new(wallet.total_balance).to_string(),
        account_id: wallet.account_id,
        is_active: wallet.is_active,
        is_locked: wallet.is_locked,
        total_deposited_minor: wallet.total_deposited,
        total_withdrawn_minor: wallet.total_withdrawn,
        total_winnings_minor: wallet.total_winnings,
        created_at: wallet.created_at,
        updated_at: wallet.updated_at,
    }
}

pub(crate) fn receipt(receipt: engine::LedgerReceipt) -> LedgerReceipt {
    LedgerReceipt {
        success: receipt.success,
        transaction_id: receipt.transaction_id,
        transaction_ref: receipt.transaction_ref,
        previous_balances: balances(receipt.previous_balances),
        new_balances: balances(receipt.new_balances),
        amount_minor: receipt.amount_minor,
        balance_type: balance_type(receipt.balance_type),
    }
}

pub(crate) fn transaction(tx: Transaction) -> TransactionView {
    let display_amount =
        Money::new(tx.amount_minor).signed(matches!(tx.kind, TransactionKind::Debit));
    TransactionView {
        id: tx.id,
        before: balances(tx.before()),
        after: balances(tx.after()),
        reference: tx.reference,
        kind: kind(tx.kind),
        category: category(tx.category),
        balance_type: balance_type(tx.balance_type),
        status: status(tx.status),
        amount_minor: tx.amount_minor,
        display_amount,
        description: tx.description,
        external_reference: tx.external_reference,
        metadata: tx.metadata,
        reversal_of: tx.reversal_of,
        reversed_by: tx.reversed_by,
        reversed_at: tx.reversed_at,
        failure_reason: tx.failure_reason,
        completed_at: tx.completed_at,
        created_at: tx.created_at,
    }
}
