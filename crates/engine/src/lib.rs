//! Wallet ledger engine.
//!
//! Keeps per-account wallets with a deposit and a withdrawable balance, an
//! append-only transaction log with balance snapshots, and the funding flow
//! through an external payment gateway.

pub use accounts::Account;
pub use balances::{BalanceType, Balances, BothSplit, Delta};
pub use commands::{CreditCmd, DebitCmd, EntryMeta, FundingCmd, RefundCmd};
pub use error::EngineError;
pub use money::Money;
pub use ops::{
    Engine, EngineBuilder, FundingStarted, LedgerReceipt, ReconcileOutcome, ReconcileReport,
    TransactionListFilter, TransactionPage,
};
pub use transactions::{Transaction, TransactionCategory, TransactionKind, TransactionStatus};
pub use wallets::Wallet;

pub mod payments;

mod accounts;
mod balances;
mod commands;
mod error;
mod money;
mod ops;
mod transactions;
mod util;
mod wallets;

pub type ResultEngine<T> = Result<T, EngineError>;
