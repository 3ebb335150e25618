//! The module contains the errors the engine can throw.
//!
//! Balance and state-machine violations are terminal and surfaced to the
//! caller as-is. Gateway failures all display as a generic
//! "payment service unavailable" message; the detail they carry is only meant
//! for logs.
use sea_orm::DbErr;
use thiserror::Error;

use crate::{BalanceType, Money};

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Account \"{0}\" not found")]
    AccountNotFound(String),
    #[error("Account \"{0}\" is inactive")]
    AccountInactive(String),
    #[error("Wallet not found for account \"{0}\"")]
    WalletNotFound(String),
    #[error("Wallet for account \"{0}\" is inactive")]
    WalletInactive(String),
    #[error("Wallet for account \"{0}\" is busy with another operation, retry later")]
    WalletLocked(String),
    #[error(
        "Insufficient {balance_type} balance: available {available}, requested {requested}, short by {shortfall}"
    )]
    InsufficientBalance {
        balance_type: BalanceType,
        available: Money,
        requested: Money,
        shortfall: Money,
    },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
    #[error("Transaction \"{0}\" already reversed")]
    AlreadyReversed(String),
    #[error("Transaction \"{0}\" cannot be reversed")]
    NotReversible(String),
    #[error("Invalid transaction state: {0}")]
    InvalidTransactionState(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("payment service unavailable")]
    GatewayUnavailable(String),
    #[error("payment service unavailable")]
    GatewayAuthFailed(String),
    #[error("payment service unavailable")]
    GatewayChargeFailed(String),
    #[error("payment service unavailable")]
    GatewayVerificationFailed(String),
    #[error("Webhook signature mismatch")]
    SignatureMismatch,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Builds an [`EngineError::InsufficientBalance`] computing the shortfall.
    pub(crate) fn insufficient(balance_type: BalanceType, available: i64, requested: i64) -> Self {
        Self::InsufficientBalance {
            balance_type,
            available: Money::new(available),
            requested: Money::new(requested),
            shortfall: Money::new(requested.saturating_sub(available).max(0)),
        }
    }

    /// Internal detail of a gateway error, `None` for every other variant.
    pub fn gateway_detail(&self) -> Option<&str> {
        match self {
            Self::GatewayUnavailable(detail)
            | Self::GatewayAuthFailed(detail)
            | Self::GatewayChargeFailed(detail)
            | Self::GatewayVerificationFailed(detail) => Some(detail),
            _ => None,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::AccountNotFound(a), Self::AccountNotFound(b)) => a == b,
            (Self::AccountInactive(a), Self::AccountInactive(b)) => a == b,
            (Self::WalletNotFound(a), Self::WalletNotFound(b)) => a == b,
            (Self::WalletInactive(a), Self::WalletInactive(b)) => a == b,
            (Self::WalletLocked(a), Self::WalletLocked(b)) => a == b,
            (
                Self::InsufficientBalance {
                    balance_type: a_type,
                    available: a_available,
                    requested: a_requested,
                    ..
                },
                Self::InsufficientBalance {
                    balance_type: b_type,
                    available: b_available,
                    requested: b_requested,
                    ..
                },
            ) => a_type == b_type && a_available == b_available && a_requested == b_requested,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidCategory(a), Self::InvalidCategory(b)) => a == b,
            (Self::AlreadyReversed(a), Self::AlreadyReversed(b)) => a == b,
            (Self::NotReversible(a), Self::NotReversible(b)) => a == b,
            (Self::InvalidTransactionState(a), Self::InvalidTransactionState(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::GatewayUnavailable(a), Self::GatewayUnavailable(b)) => a == b,
            (Self::GatewayAuthFailed(a), Self::GatewayAuthFailed(b)) => a == b,
            (Self::GatewayChargeFailed(a), Self::GatewayChargeFailed(b)) => a == b,
            (Self::GatewayVerificationFailed(a), Self::GatewayVerificationFailed(b)) => a == b,
            (Self::SignatureMismatch, Self::SignatureMismatch) => true,
            (Self::InvalidPayload(a), Self::InvalidPayload(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_reports_shortfall() {
        let err = EngineError::insufficient(BalanceType::Withdrawable, 100_00, 150_00);
        assert_eq!(
            err.to_string(),
            "Insufficient withdrawable balance: available ₦100.00, requested ₦150.00, short by ₦50.00"
        );
    }

    #[test]
    fn gateway_errors_hide_detail() {
        let err = EngineError::GatewayAuthFailed("401 from provider: bad credentials".to_string());
        assert_eq!(err.to_string(), "payment service unavailable");
        assert_eq!(err.gateway_detail(), Some("401 from provider: bad credentials"));
    }
}
