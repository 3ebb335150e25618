//! Payment (wallet funding) API endpoints.

use api_types::payment::{FundingNew, FundingStarted, ReconcileOutcome, ReconcileResponse};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::TypedHeader;
use engine::{EngineError, FundingCmd};
use serde::Serialize;

use crate::{ServerError, server::PaymentSignature, server::ServerState, views};

pub async fn initiate(
    State(state): State<ServerState>,
    Json(payload): Json<FundingNew>,
) -> Result<(StatusCode, Json<FundingStarted>), ServerError> {
    let mut cmd = FundingCmd::new(payload.account_id, payload.amount_minor).methods(payload.methods);
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }

    let started = state.engine.initiate_funding(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(FundingStarted {
            transaction_id: started.transaction_id,
            payment_reference: started.payment_reference,
            provider_reference: started.provider_reference,
            checkout_url: started.checkout_url,
            amount_minor: started.amount_minor,
        }),
    ))
}

pub async fn verify(
    State(state): State<ServerState>,
    Path(reference): Path<String>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    let outcome = state.engine.verify_payment(&reference).await?;
    Ok(Json(ReconcileResponse {
        outcome: views::outcome(outcome),
    }))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<ReconcileOutcome>,
}

/// Provider callback.
///
/// Bad signatures, malformed bodies and settled or unknown payments are
/// acknowledged with 200. A busy wallet, an unreachable provider or a database
/// failure is returned as an error status so the provider redelivers.
pub async fn webhook(
    State(state): State<ServerState>,
    signature: Option<TypedHeader<PaymentSignature>>,
    body: Bytes,
) -> Result<Json<WebhookAck>, ServerError> {
    let signature = signature.map(|TypedHeader(PaymentSignature(value))| value);
    let outcome = match state.engine.handle_webhook(&body, signature.as_deref()).await {
        Ok(outcome) => {
            tracing::info!(?outcome, "webhook processed");
            Some(views::outcome(outcome))
        }
        Err(EngineError::SignatureMismatch) => None,
        Err(err) if should_redeliver(&err) => {
            tracing::warn!("webhook deferred for redelivery: {err}");
            return Err(err.into());
        }
        Err(err) => {
            tracing::warn!("webhook not processed: {err}");
            None
        }
    };

    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}

fn should_redeliver(err: &EngineError) -> bool {
    matches!(
        err,
        EngineError::WalletLocked(_)
            | EngineError::Database(_)
            | EngineError::GatewayUnavailable(_)
            | EngineError::GatewayAuthFailed(_)
            | EngineError::GatewayChargeFailed(_)
            | EngineError::GatewayVerificationFailed(_)
    )
}
