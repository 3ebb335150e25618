//! Payment gateway contract.
//!
//! The engine only talks to the payment provider through [`PaymentGateway`];
//! the HTTP implementation lives in the `gateway` crate. Amounts cross this
//! boundary in minor units.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EngineError, Transaction};

/// Payment provider errors. Converted into the `Gateway*` engine variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("charge initiation failed: {0}")]
    Charge(String),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("provider unreachable: {0}")]
    Unavailable(String),
}

impl From<GatewayError> for EngineError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::Auth(detail) => EngineError::GatewayAuthFailed(detail),
            GatewayError::Charge(detail) => EngineError::GatewayChargeFailed(detail),
            GatewayError::Verification(detail) => EngineError::GatewayVerificationFailed(detail),
            GatewayError::Unavailable(detail) => EngineError::GatewayUnavailable(detail),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount_minor: i64,
    /// Account id of the payer, sent as the provider's customer email/ref.
    pub customer_ref: String,
    pub customer_name: String,
    pub payment_reference: String,
    pub description: String,
    /// Allowed payment methods, e.g. `CARD`, `ACCOUNT_TRANSFER`.
    pub methods: Vec<String>,
}

/// What the payer needs to complete a charge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutHandle {
    pub provider_reference: String,
    pub payment_reference: String,
    pub checkout_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderStatus {
    Paid,
    Pending,
    Failed,
    Cancelled,
    Expired,
    Other(String),
}

impl From<&str> for ProviderStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PAID" => Self::Paid,
            "PENDING" => Self::Pending,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            "EXPIRED" => Self::Expired,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl ProviderStatus {
    /// Collapses the provider vocabulary into what the ledger acts on.
    ///
    /// Unrecognised statuses are treated as still pending so a later
    /// verification can settle them.
    pub fn outcome(&self) -> PaymentOutcome {
        match self {
            Self::Paid => PaymentOutcome::Success,
            Self::Failed | Self::Cancelled | Self::Expired => PaymentOutcome::Failed,
            Self::Pending | Self::Other(_) => PaymentOutcome::Pending,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Pending,
    Failed,
}

/// Authoritative payment state as reported by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    pub status: ProviderStatus,
    pub payment_reference: String,
    pub provider_reference: String,
    pub amount_paid_minor: i64,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns a bearer token, reusing a cached one while it is still valid.
    async fn authenticate(&self) -> Result<String, GatewayError>;

    async fn initiate_charge(&self, request: ChargeRequest) -> Result<CheckoutHandle, GatewayError>;

    async fn verify_transaction(&self, provider_reference: &str)
    -> Result<Verification, GatewayError>;

    /// Checks the webhook signature over the raw request body.
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool;
}

/// Webhook body sent by the provider.
///
/// Only the references are trusted; the status is always re-verified.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub transaction_reference: String,
    pub payment_reference: String,
    #[serde(default)]
    pub amount_paid: Option<serde_json::Value>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub meta_data: Option<serde_json::Value>,
}

impl WebhookPayload {
    pub fn parse(raw: &[u8]) -> Result<Self, EngineError> {
        serde_json::from_slice(raw).map_err(|err| EngineError::InvalidPayload(err.to_string()))
    }
}

/// Receives settled funding payments. Must not block.
pub trait PaymentNotifier: Send + Sync {
    fn payment_completed(&self, transaction: &Transaction);
    fn payment_failed(&self, transaction: &Transaction);
}

/// Default notifier: writes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl PaymentNotifier for LogNotifier {
    fn payment_completed(&self, transaction: &Transaction) {
        tracing::info!(
            account_id = %transaction.account_id,
            reference = %transaction.reference,
            amount_minor = transaction.amount_minor,
            "wallet funded"
        );
    }

    fn payment_failed(&self, transaction: &Transaction) {
        tracing::info!(
            account_id = %transaction.account_id,
            reference = %transaction.reference,
            reason = transaction.failure_reason.as_deref().unwrap_or(""),
            "wallet funding failed"
        );
    }
}
