use axum::{
    Router,
    http::{HeaderName, HeaderValue},
    routing::{get, post},
};
use axum_extra::headers::{Error as AxumError, Header};

use std::sync::Arc;

use crate::{accounts, payments, transactions, wallets};
use engine::Engine;

static PAYMENT_SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-payment-signature");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `TypedHeader` carrying the provider's webhook signature.
///
/// Webhook deliveries must contain the "x-payment-signature" entry in the
/// header: a hex HMAC-SHA512 of the raw body.
#[derive(Debug)]
pub(crate) struct PaymentSignature(pub String);

impl Header for PaymentSignature {
    fn name() -> &'static HeaderName {
        &PAYMENT_SIGNATURE_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };

        Ok(PaymentSignature(value.trim().to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        match HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-payment-signature header"),
        }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", post(accounts::open))
        .route(
            "/wallets/{account_id}",
            post(wallets::get_or_create).get(wallets::show),
        )
        .route("/wallets/{account_id}/credit", post(wallets::credit))
        .route("/wallets/{account_id}/debit", post(wallets::debit))
        .route("/wallets/{account_id}/refund", post(wallets::refund))
        .route("/wallets/{account_id}/disable", post(wallets::disable))
        .route(
            "/wallets/{account_id}/transactions",
            get(transactions::list),
        )
        .route("/transactions/{tx}", get(transactions::get))
        .route("/transactions/{tx}/reverse", post(transactions::reverse))
        .route("/payments/initiate", post(payments::initiate))
        .route("/payments/webhook", post(payments::webhook))
        .route("/payments/{reference}/verify", post(payments::verify))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine };

    axum::serve(listener, router(state)).await
}
