//! Command structs for engine operations.
//!
//! These types group parameters for write operations
//! (credit/debit/refund/funding), keeping call sites readable and avoiding
//! long argument lists.

use crate::{BalanceType, TransactionCategory};

/// Descriptive fields shared by every ledger entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryMeta {
    pub description: Option<String>,
    /// Caller-chosen unique reference. Generated when absent.
    pub reference: Option<String>,
    pub external_reference: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl EntryMeta {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn external_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Add funds to a wallet.
#[derive(Clone, Debug, PartialEq)]
pub struct CreditCmd {
    pub account_id: String,
    pub amount_minor: i64,
    pub category: TransactionCategory,
    pub balance_type: BalanceType,
    pub meta: EntryMeta,
}

impl CreditCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        amount_minor: i64,
        category: TransactionCategory,
        balance_type: BalanceType,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount_minor,
            category,
            balance_type,
            meta: EntryMeta::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta = self.meta.description(description);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.meta = self.meta.reference(reference);
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.meta = self.meta.metadata(metadata);
        self
    }
}

/// Remove funds from a wallet.
#[derive(Clone, Debug, PartialEq)]
pub struct DebitCmd {
    pub account_id: String,
    pub amount_minor: i64,
    pub category: TransactionCategory,
    pub balance_type: BalanceType,
    pub meta: EntryMeta,
}

impl DebitCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        amount_minor: i64,
        category: TransactionCategory,
        balance_type: BalanceType,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount_minor,
            category,
            balance_type,
            meta: EntryMeta::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta = self.meta.description(description);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.meta = self.meta.reference(reference);
        self
    }

    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.meta = self.meta.metadata(metadata);
        self
    }
}

/// Give money back for a cancelled or failed service.
#[derive(Clone, Debug, PartialEq)]
pub struct RefundCmd {
    pub account_id: String,
    pub amount_minor: i64,
    /// Reference of the entry being refunded, stored as external reference.
    pub original_reference: String,
    pub reason: String,
    pub balance_type: BalanceType,
}

impl RefundCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        amount_minor: i64,
        original_reference: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount_minor,
            original_reference: original_reference.into(),
            reason: reason.into(),
            balance_type: BalanceType::Deposit,
        }
    }

    #[must_use]
    pub fn balance_type(mut self, balance_type: BalanceType) -> Self {
        self.balance_type = balance_type;
        self
    }
}

/// Start an external card/transfer payment that tops up the deposit balance.
#[derive(Clone, Debug, PartialEq)]
pub struct FundingCmd {
    pub account_id: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    /// Payment methods offered at checkout; empty means provider default.
    pub methods: Vec<String>,
}

impl FundingCmd {
    #[must_use]
    pub fn new(account_id: impl Into<String>, amount_minor: i64) -> Self {
        Self {
            account_id: account_id.into(),
            amount_minor,
            description: None,
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn methods(mut self, methods: Vec<String>) -> Self {
        self.methods = methods;
        self
    }
}
