//! Ledger entries.
//!
//! A `Transaction` records one balance mutation of one wallet together with
//! the before/after snapshots of all three balances. Entries are append-only:
//! once terminal only the lifecycle timestamps and links may be filled in.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BalanceType, Balances, Delta, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            Self::Credit => Self::Debit,
            Self::Debit => Self::Credit,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(EngineError::InvalidCategory(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Business reason of a ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
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
    /// Reserved for entries produced by [`crate::Engine::reverse`].
    Reversal,
}

impl TransactionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Refund => "refund",
            Self::Adjustment => "adjustment",
            Self::DeliveryPayment => "delivery_payment",
            Self::Commission => "commission",
            Self::Winnings => "winnings",
            Self::Payout => "payout",
            Self::Reversal => "reversal",
        }
    }
}

impl TryFrom<&str> for TransactionCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "refund" => Ok(Self::Refund),
            "adjustment" => Ok(Self::Adjustment),
            "delivery_payment" => Ok(Self::DeliveryPayment),
            "commission" => Ok(Self::Commission),
            "winnings" => Ok(Self::Winnings),
            "payout" => Ok(Self::Payout),
            "reversal" => Ok(Self::Reversal),
            other => Err(EngineError::InvalidCategory(format!(
                "invalid transaction category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Reversed => "reversed",
        }
    }

    /// `Pending -> Completed | Failed`, `Completed -> Reversed`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Completed, Self::Reversed)
        )
    }

    pub fn transition_to(self, next: Self) -> ResultEngine<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(EngineError::InvalidTransactionState(format!(
                "{} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "reversed" => Ok(Self::Reversed),
            other => Err(EngineError::InvalidTransactionState(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub reference: String,
    pub wallet_id: Uuid,
    pub account_id: String,
    pub kind: TransactionKind,
    pub category: TransactionCategory,
    pub balance_type: BalanceType,
    pub status: TransactionStatus,
    pub amount_minor: i64,
    pub deposit_balance_before: i64,
    pub deposit_balance_after: i64,
    pub withdrawable_balance_before: i64,
    pub withdrawable_balance_after: i64,
    pub total_balance_before: i64,
    pub total_balance_after: i64,
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

/// Fields chosen by the caller when writing an entry.
#[derive(Clone, Debug)]
pub(crate) struct NewEntry {
    pub reference: String,
    pub kind: TransactionKind,
    pub category: TransactionCategory,
    pub balance_type: BalanceType,
    pub amount_minor: i64,
    pub description: String,
    pub external_reference: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl Transaction {
    /// A COMPLETED entry moving the wallet from `before` to `after`.
    pub(crate) fn completed(
        wallet_id: Uuid,
        account_id: String,
        entry: NewEntry,
        before: Balances,
        after: Balances,
    ) -> Self {
        let now = Utc::now();
        let mut tx = Self::with_snapshots(wallet_id, account_id, entry, before, after, now);
        tx.status = TransactionStatus::Completed;
        tx.completed_at = Some(now);
        tx
    }

    /// A PENDING entry; both snapshots equal the balances at initiation.
    pub(crate) fn pending(
        wallet_id: Uuid,
        account_id: String,
        entry: NewEntry,
        current: Balances,
    ) -> Self {
        Self::with_snapshots(wallet_id, account_id, entry, current, current, Utc::now())
    }

    fn with_snapshots(
        wallet_id: Uuid,
        account_id: String,
        entry: NewEntry,
        before: Balances,
        after: Balances,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: entry.reference,
            wallet_id,
            account_id,
            kind: entry.kind,
            category: entry.category,
            balance_type: entry.balance_type,
            status: TransactionStatus::Pending,
            amount_minor: entry.amount_minor,
            deposit_balance_before: before.deposit,
            deposit_balance_after: after.deposit,
            withdrawable_balance_before: before.withdrawable,
            withdrawable_balance_after: after.withdrawable,
            total_balance_before: before.total,
            total_balance_after: after.total,
            description: entry.description,
            external_reference: entry.external_reference,
            metadata: entry.metadata,
            reversal_of: None,
            reversed_by: None,
            reversed_at: None,
            failure_reason: None,
            completed_at: None,
            created_at: now,
        }
    }

    pub fn before(&self) -> Balances {
        Balances::new(self.deposit_balance_before, self.withdrawable_balance_before)
    }

    pub fn after(&self) -> Balances {
        Balances::new(self.deposit_balance_after, self.withdrawable_balance_after)
    }

    /// Net effect of this entry on the wallet buckets.
    pub fn delta(&self) -> Delta {
        Delta::between(self.before(), self.after())
    }

    pub fn is_reversal(&self) -> bool {
        self.category == TransactionCategory::Reversal || self.reversal_of.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub reference: String,
    pub wallet_id: String,
    pub account_id: String,
    pub kind: String,
    pub category: String,
    pub balance_type: String,
    pub status: String,
    pub amount_minor: i64,
    pub deposit_balance_before: i64,
    pub deposit_balance_after: i64,
    pub withdrawable_balance_before: i64,
    pub withdrawable_balance_after: i64,
    pub total_balance_before: i64,
    pub total_balance_after: i64,
    pub description: String,
    pub external_reference: Option<String>,
    pub metadata: Option<Json>,
    pub reversal_of: Option<String>,
    pub reversed_by: Option<String>,
    pub reversed_at: Option<DateTimeUtc>,
    pub failure_reason: Option<String>,
    pub completed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallet,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            reference: ActiveValue::Set(tx.reference.clone()),
            wallet_id: ActiveValue::Set(tx.wallet_id.to_string()),
            account_id: ActiveValue::Set(tx.account_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            category: ActiveValue::Set(tx.category.as_str().to_string()),
            balance_type: ActiveValue::Set(tx.balance_type.as_str().to_string()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            deposit_balance_before: ActiveValue::Set(tx.deposit_balance_before),
            deposit_balance_after: ActiveValue::Set(tx.deposit_balance_after),
            withdrawable_balance_before: ActiveValue::Set(tx.withdrawable_balance_before),
            withdrawable_balance_after: ActiveValue::Set(tx.withdrawable_balance_after),
            total_balance_before: ActiveValue::Set(tx.total_balance_before),
            total_balance_after: ActiveValue::Set(tx.total_balance_after),
            description: ActiveValue::Set(tx.description.clone()),
            external_reference: ActiveValue::Set(tx.external_reference.clone()),
            metadata: ActiveValue::Set(tx.metadata.clone()),
            reversal_of: ActiveValue::Set(tx.reversal_of.map(|id| id.to_string())),
            reversed_by: ActiveValue::Set(tx.reversed_by.map(|id| id.to_string())),
            reversed_at: ActiveValue::Set(tx.reversed_at),
            failure_reason: ActiveValue::Set(tx.failure_reason.clone()),
            completed_at: ActiveValue::Set(tx.completed_at),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let optional_id = |value: Option<String>| -> ResultEngine<Option<Uuid>> {
            value
                .as_deref()
                .map(|s| parse_uuid(s, "transaction"))
                .transpose()
        };
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            reference: model.reference,
            wallet_id: parse_uuid(&model.wallet_id, "wallet")?,
            account_id: model.account_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            category: TransactionCategory::try_from(model.category.as_str())?,
            balance_type: BalanceType::try_from(model.balance_type.as_str())?,
            status: TransactionStatus::try_from(model.status.as_str())?,
            amount_minor: model.amount_minor,
            deposit_balance_before: model.deposit_balance_before,
            deposit_balance_after: model.deposit_balance_after,
            withdrawable_balance_before: model.withdrawable_balance_before,
            withdrawable_balance_after: model.withdrawable_balance_after,
            total_balance_before: model.total_balance_before,
            total_balance_after: model.total_balance_after,
            description: model.description,
            external_reference: model.external_reference,
            metadata: model.metadata,
            reversal_of: optional_id(model.reversal_of)?,
            reversed_by: optional_id(model.reversed_by)?,
            reversed_at: model.reversed_at,
            failure_reason: model.failure_reason,
            completed_at: model.completed_at,
            created_at: model.created_at,
        })
    }
}
