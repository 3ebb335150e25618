use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which bucket(s) of a wallet an operation targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceType {
    #[default]
    Deposit,
    Withdrawable,
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub deposit_minor: i64,
    pub withdrawable_minor: i64,
    pub total_minor: i64,
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub account_id: String,
        /// Shown to the payment provider as the customer name.
        pub display_name: Option<String>,
    }
}

pub mod wallet {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletView {
        pub id: Uuid,
        pub account_id: String,
        pub balances: Balances,
        /// Formatted total, e.g. `₦1,250.00`.
        pub display_total: String,
        pub is_active: bool,
        pub is_locked: bool,
        pub total_deposited_minor: i64,
        pub total_withdrawn_minor: i64,
        pub total_winnings_minor: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CreditNew {
        /// Must be > 0.
        pub amount_minor: i64,
        pub category: crate::transaction::TransactionCategory,
        #[serde(default)]
        pub balance_type: BalanceType,
        pub description: Option<String>,
        /// Caller-chosen unique reference; generated when absent.
        pub reference: Option<String>,
        pub metadata: Option<serde_json::Value>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebitNew {
        /// Must be > 0.
        pub amount_minor: i64,
        pub category: crate::transaction::TransactionCategory,
        #[serde(default)]
        pub balance_type: BalanceType,
        pub description: Option<String>,
        pub reference: Option<String>,
        pub metadata: Option<serde_json::Value>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefundNew {
        pub amount_minor: i64,
        /// Reference of the entry being refunded.
        pub original_reference: String,
        pub reason: String,
        #[serde(default)]
        pub balance_type: BalanceType,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerReceipt {
        pub success: bool,
        pub transaction_id: Uuid,
        pub transaction_ref: String,
        pub previous_balances: Balances,
        pub new_balances: Balances,
        pub amount_minor: i64,
        pub balance_type: BalanceType,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Credit,
        Debit,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionCategory {
        Deposit,
        Withdrawal,
        Refund,
        Adjustment,
        DeliveryPayment,
        Commission,
        Winnings,
        Payout,
        Reversal,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Pending,
        Completed,
        Failed,
        Reversed,
    }

    /// Query string of the transaction list.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        /// 1-based, defaults to 1.
        pub page: Option<u64>,
        /// Clamped to 1..=100, defaults to 20.
        pub per_page: Option<u64>,
        pub status: Option<TransactionStatus>,
        pub category: Option<TransactionCategory>,
        pub kind: Option<TransactionKind>,
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub reference: String,
        pub kind: TransactionKind,
        pub category: TransactionCategory,
        pub balance_type: BalanceType,
        pub status: TransactionStatus,
        pub amount_minor: i64,
        /// Signed, formatted amount, e.g. `-₦25.50` for a debit.
        pub display_amount: String,
        pub before: Balances,
        pub after: Balances,
        pub description: String,
        pub external_reference: Option<String>,
        pub metadata: Option<serde_json::Value>,
        pub reversal_of: Option<Uuid>,
        pub reversed_by: Option<Uuid>,
        pub reversed_at: Option<DateTime<Utc>>,
        pub failure_reason: Option<String>,
        pub completed_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub page: u64,
        pub per_page: u64,
        pub total_items: u64,
        pub total_pages: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionReverse {
        pub reason: String,
    }
}

pub mod payment {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundingNew {
        pub account_id: String,
        pub amount_minor: i64,
        pub description: Option<String>,
        /// Payment methods offered at checkout, e.g. `["CARD"]`.
        #[serde(default)]
        pub methods: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundingStarted {
        pub transaction_id: Uuid,
        pub payment_reference: String,
        pub provider_reference: String,
        pub checkout_url: String,
        pub amount_minor: i64,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ReconcileOutcome {
        Completed,
        Failed,
        StillPending,
        AlreadyProcessed,
        Unknown,
        Ignored,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReconcileResponse {
        pub outcome: ReconcileOutcome,
    }
}
