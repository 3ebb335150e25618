//! The module contains `Wallet` struct and its implementation.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Balances, EngineError, ResultEngine, TransactionCategory, TransactionKind, util::parse_uuid,
};

/// A wallet.
///
/// One wallet per account holder. Balances are split between funds that can
/// only be spent on the platform (`deposit_balance`) and funds that can be
/// paid out (`withdrawable_balance`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Stable identifier for this wallet.
    pub id: Uuid,
    /// Owning account, unique across wallets.
    pub account_id: String,
    pub deposit_balance: i64,
    pub withdrawable_balance: i64,
    /// Always `deposit_balance + withdrawable_balance`.
    pub total_balance: i64,
    pub is_active: bool,
    /// Set while a balance mutation is in flight.
    pub is_locked: bool,
    pub total_deposited: i64,
    pub total_withdrawn: i64,
    pub total_winnings: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(account_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            deposit_balance: 0,
            withdrawable_balance: 0,
            total_balance: 0,
            is_active: true,
            is_locked: false,
            total_deposited: 0,
            total_withdrawn: 0,
            total_winnings: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn balances(&self) -> Balances {
        Balances::new(self.deposit_balance, self.withdrawable_balance)
    }

    /// Rejects inactive and locked wallets without touching the database.
    pub(crate) fn ensure_usable(&self) -> ResultEngine<()> {
        if !self.is_active {
            return Err(EngineError::WalletInactive(self.account_id.clone()));
        }
        if self.is_locked {
            return Err(EngineError::WalletLocked(self.account_id.clone()));
        }
        Ok(())
    }

    /// Moves the wallet to `after` and bumps the lifetime counters.
    pub(crate) fn record(&mut self, after: Balances, counters: CounterIncrements) {
        self.deposit_balance = after.deposit;
        self.withdrawable_balance = after.withdrawable;
        self.total_balance = after.total;
        self.total_deposited = self.total_deposited.saturating_add(counters.deposited);
        self.total_withdrawn = self.total_withdrawn.saturating_add(counters.withdrawn);
        self.total_winnings = self.total_winnings.saturating_add(counters.winnings);
    }
}

/// Increments of the lifetime counters caused by one ledger entry.
///
/// Counters only ever grow: reversals and refunds never touch them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CounterIncrements {
    pub deposited: i64,
    pub withdrawn: i64,
    pub winnings: i64,
}

impl CounterIncrements {
    pub(crate) fn for_entry(kind: TransactionKind, category: TransactionCategory, amount: i64) -> Self {
        match (kind, category) {
            (TransactionKind::Credit, TransactionCategory::Deposit) => Self {
                deposited: amount,
                ..Self::default()
            },
            (TransactionKind::Credit, TransactionCategory::Winnings) => Self {
                winnings: amount,
                ..Self::default()
            },
            (TransactionKind::Debit, TransactionCategory::Withdrawal) => Self {
                withdrawn: amount,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub account_id: String,
    pub deposit_balance: i64,
    pub withdrawable_balance: i64,
    pub total_balance: i64,
    pub is_active: bool,
    pub is_locked: bool,
    pub total_deposited: i64,
    pub total_withdrawn: i64,
    pub total_winnings: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Account,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            account_id: ActiveValue::Set(value.account_id.clone()),
            deposit_balance: ActiveValue::Set(value.deposit_balance),
            withdrawable_balance: ActiveValue::Set(value.withdrawable_balance),
            total_balance: ActiveValue::Set(value.total_balance),
            is_active: ActiveValue::Set(value.is_active),
            is_locked: ActiveValue::Set(value.is_locked),
            total_deposited: ActiveValue::Set(value.total_deposited),
            total_withdrawn: ActiveValue::Set(value.total_withdrawn),
            total_winnings: ActiveValue::Set(value.total_winnings),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "wallet")?,
            account_id: model.account_id,
            deposit_balance: model.deposit_balance,
            withdrawable_balance: model.withdrawable_balance,
            total_balance: model.total_balance,
            is_active: model.is_active,
            is_locked: model.is_locked,
            total_deposited: model.total_deposited,
            total_withdrawn: model.total_withdrawn,
            total_winnings: model.total_winnings,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wallet_is_empty_active_and_unlocked() {
        let wallet = Wallet::new("rider-1".to_string());
        assert_eq!(wallet.balances(), Balances::new(0, 0));
        assert!(wallet.is_active);
        assert!(!wallet.is_locked);
        assert!(wallet.ensure_usable().is_ok());
    }

    #[test]
    fn locked_or_inactive_wallet_is_unusable() {
        let mut wallet = Wallet::new("rider-1".to_string());
        wallet.is_locked = true;
        assert_eq!(
            wallet.ensure_usable(),
            Err(EngineError::WalletLocked("rider-1".to_string()))
        );

        wallet.is_active = false;
        assert_eq!(
            wallet.ensure_usable(),
            Err(EngineError::WalletInactive("rider-1".to_string()))
        );
    }

    #[test]
    fn counters_follow_category() {
        let deposit =
            CounterIncrements::for_entry(TransactionKind::Credit, TransactionCategory::Deposit, 500);
        assert_eq!(deposit.deposited, 500);

        let withdrawal = CounterIncrements::for_entry(
            TransactionKind::Debit,
            TransactionCategory::Withdrawal,
            200,
        );
        assert_eq!(withdrawal.withdrawn, 200);

        let winnings =
            CounterIncrements::for_entry(TransactionKind::Credit, TransactionCategory::Winnings, 70);
        assert_eq!(winnings.winnings, 70);

        let refund =
            CounterIncrements::for_entry(TransactionKind::Credit, TransactionCategory::Refund, 90);
        assert_eq!(refund, CounterIncrements::default());
    }
}
