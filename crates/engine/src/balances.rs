//! Balance arithmetic.
//!
//! A wallet holds two spendable buckets, `deposit` and `withdrawable`, and a
//! derived `total`. Every mutation is expressed as a [`Delta`] on the two
//! buckets; `total` is always recomputed from them and never assigned.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Which bucket(s) a ledger entry targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceType {
    Deposit,
    Withdrawable,
    Both,
}

impl BalanceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawable => "withdrawable",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for BalanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BalanceType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawable" => Ok(Self::Withdrawable),
            "both" => Ok(Self::Both),
            other => Err(EngineError::InvalidCategory(format!(
                "invalid balance type: {other}"
            ))),
        }
    }
}

/// A snapshot of the three wallet balances, in minor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub deposit: i64,
    pub withdrawable: i64,
    pub total: i64,
}

impl Balances {
    /// Builds a snapshot, deriving `total` from the two buckets.
    pub fn new(deposit: i64, withdrawable: i64) -> Self {
        Self {
            deposit,
            withdrawable,
            total: deposit + withdrawable,
        }
    }

    /// Funds usable for a debit of the given balance type.
    pub fn available(&self, balance_type: BalanceType) -> i64 {
        match balance_type {
            BalanceType::Deposit => self.deposit,
            BalanceType::Withdrawable => self.withdrawable,
            BalanceType::Both => self.total,
        }
    }

    /// Applies a delta, refusing overflow and negative buckets.
    ///
    /// `balance_type` is only used to label the error.
    pub(crate) fn apply(self, delta: Delta, balance_type: BalanceType) -> ResultEngine<Balances> {
        let overflow = || EngineError::InvalidAmount("balance overflow".to_string());
        let deposit = self
            .deposit
            .checked_add(delta.deposit)
            .ok_or_else(overflow)?;
        let withdrawable = self
            .withdrawable
            .checked_add(delta.withdrawable)
            .ok_or_else(overflow)?;
        deposit.checked_add(withdrawable).ok_or_else(overflow)?;

        if deposit < 0 || withdrawable < 0 {
            return Err(EngineError::insufficient(
                balance_type,
                self.available(balance_type),
                delta.magnitude(),
            ));
        }
        Ok(Balances::new(deposit, withdrawable))
    }
}

/// Signed change applied to the two buckets by one ledger entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    pub deposit: i64,
    pub withdrawable: i64,
}

impl Delta {
    /// Delta between two snapshots (`after - before`).
    pub fn between(before: Balances, after: Balances) -> Self {
        Self {
            deposit: after.deposit - before.deposit,
            withdrawable: after.withdrawable - before.withdrawable,
        }
    }

    /// The compensating delta.
    pub fn inverse(self) -> Self {
        Self {
            deposit: -self.deposit,
            withdrawable: -self.withdrawable,
        }
    }

    fn magnitude(self) -> i64 {
        self.deposit.abs() + self.withdrawable.abs()
    }
}

/// How a credit targeting [`BalanceType::Both`] is split between buckets.
///
/// Expressed as the percentage going to `deposit`; the remainder (including
/// any odd minor unit left by rounding down) goes to `withdrawable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BothSplit {
    deposit_percent: u8,
}

impl BothSplit {
    pub fn new(deposit_percent: u8) -> ResultEngine<Self> {
        if deposit_percent > 100 {
            return Err(EngineError::InvalidAmount(format!(
                "split percent must be <= 100, got {deposit_percent}"
            )));
        }
        Ok(Self { deposit_percent })
    }

    pub fn deposit_percent(self) -> u8 {
        self.deposit_percent
    }

    fn split(self, amount: i64) -> (i64, i64) {
        let deposit = (i128::from(amount) * i128::from(self.deposit_percent) / 100) as i64;
        (deposit, amount - deposit)
    }
}

impl Default for BothSplit {
    fn default() -> Self {
        Self {
            deposit_percent: 50,
        }
    }
}

/// Delta for crediting `amount` to the given bucket(s).
pub(crate) fn credit_delta(amount: i64, balance_type: BalanceType, split: BothSplit) -> Delta {
    match balance_type {
        BalanceType::Deposit => Delta {
            deposit: amount,
            withdrawable: 0,
        },
        BalanceType::Withdrawable => Delta {
            deposit: 0,
            withdrawable: amount,
        },
        BalanceType::Both => {
            let (deposit, withdrawable) = split.split(amount);
            Delta {
                deposit,
                withdrawable,
            }
        }
    }
}

/// Delta for debiting `amount`, checking sufficiency against `current`.
///
/// `Both` draws from deposit first and spills the rest into withdrawable.
pub(crate) fn debit_delta(
    current: Balances,
    amount: i64,
    balance_type: BalanceType,
) -> ResultEngine<Delta> {
    let available = current.available(balance_type);
    if available < amount {
        return Err(EngineError::insufficient(balance_type, available, amount));
    }

    Ok(match balance_type {
        BalanceType::Deposit => Delta {
            deposit: -amount,
            withdrawable: 0,
        },
        BalanceType::Withdrawable => Delta {
            deposit: 0,
            withdrawable: -amount,
        },
        BalanceType::Both => {
            let from_deposit = current.deposit.max(0).min(amount);
            Delta {
                deposit: -from_deposit,
                withdrawable: -(amount - from_deposit),
            }
        }
    })
}
