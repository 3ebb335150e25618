//! HTTP client for the payment provider.
//!
//! Implements [`engine::payments::PaymentGateway`] over the provider's JSON
//! API: basic-auth login for a short-lived bearer token, checkout
//! initiation, transaction status lookup and webhook signature checks.

use std::time::Duration;

use async_trait::async_trait;
use engine::payments::{
    ChargeRequest, CheckoutHandle, GatewayError, PaymentGateway, ProviderStatus, Verification,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use auth::TokenCache;
use wire::{Envelope, InitTransaction, InitTransactionBody, LoginBody, TransactionStatusBody};

mod auth;
pub mod signature;
mod wire;

const LOGIN_PATH: &str = "/api/v1/auth/login";
const INIT_TRANSACTION_PATH: &str = "/api/v1/merchant/transactions/init-transaction";
const TRANSACTION_STATUS_PATH: &str = "/api/v2/transactions";
const CURRENCY_CODE: &str = "NGN";

/// Provider credentials and endpoints.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub secret_key: String,
    pub contract_code: String,
    /// Where the payer lands after checkout.
    pub redirect_url: Option<String>,
    /// Subtracted from the token lifetime before it is considered stale.
    pub token_safety_margin: Duration,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        contract_code: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            contract_code: contract_code.into(),
            redirect_url: None,
            token_safety_margin: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
    token: TokenCache,
}

/// Which call failed, used to pick the error variant.
#[derive(Clone, Copy, Debug)]
enum Stage {
    Auth,
    Charge,
    Verification,
}

impl Stage {
    fn error(self, detail: String) -> GatewayError {
        match self {
            Self::Auth => GatewayError::Auth(detail),
            Self::Charge => GatewayError::Charge(detail),
            Self::Verification => GatewayError::Verification(detail),
        }
    }
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| GatewayError::Unavailable(err.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: GatewayConfig) -> Self {
        Self {
            client,
            token: TokenCache::new(config.token_safety_margin),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn login(&self) -> Result<(String, Duration), GatewayError> {
        let request = self
            .client
            .post(self.url(LOGIN_PATH))
            .basic_auth(&self.config.api_key, Some(&self.config.secret_key));
        let body: LoginBody = send_enveloped(request, Stage::Auth)
            .await
            .map_err(|err| match err {
                SendError::Unauthorized => GatewayError::Auth("credentials rejected".to_string()),
                SendError::Gateway(err) => err,
            })?;
        Ok((body.access_token, Duration::from_secs(body.expires_in)))
    }

    /// Sends an authenticated request, re-logging in once on 401.
    async fn authorized<T, F>(&self, stage: Stage, build: F) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.authenticate().await?;
        match send_enveloped(build(&token), stage).await {
            Err(SendError::Unauthorized) => {
                tracing::info!("gateway token rejected, logging in again");
                self.token.invalidate().await;
                let token = self.authenticate().await?;
                send_enveloped(build(&token), stage)
                    .await
                    .map_err(SendError::into_gateway)
            }
            other => other.map_err(SendError::into_gateway),
        }
    }
}

/// Failure of one provider call.
#[derive(Debug)]
enum SendError {
    /// The provider rejected the bearer token.
    Unauthorized,
    Gateway(GatewayError),
}

impl SendError {
    fn into_gateway(self) -> GatewayError {
        match self {
            Self::Unauthorized => GatewayError::Auth("access token rejected".to_string()),
            Self::Gateway(err) => err,
        }
    }
}

async fn send_enveloped<T: DeserializeOwned>(
    request: RequestBuilder,
    stage: Stage,
) -> Result<T, SendError> {
    let response = request
        .send()
        .await
        .map_err(|err| SendError::Gateway(GatewayError::Unavailable(err.to_string())))?;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(SendError::Unauthorized);
    }

    let envelope = response.json::<Envelope<T>>().await.map_err(|err| {
        SendError::Gateway(stage.error(format!("{status}: unreadable response: {err}")))
    })?;
    if !status.is_success() || !envelope.request_successful {
        return Err(SendError::Gateway(
            stage.error(format!("{status}: {}", envelope.response_message)),
        ));
    }
    envelope
        .response_body
        .ok_or_else(|| SendError::Gateway(stage.error(format!("{status}: empty response body"))))
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn authenticate(&self) -> Result<String, GatewayError> {
        self.token.get_or_refresh(move || self.login()).await
    }

    async fn initiate_charge(&self, request: ChargeRequest) -> Result<CheckoutHandle, GatewayError> {
        let body = InitTransaction {
            amount: wire::to_major(request.amount_minor),
            customer_name: &request.customer_name,
            customer_email: &request.customer_ref,
            payment_reference: &request.payment_reference,
            payment_description: &request.description,
            currency_code: CURRENCY_CODE,
            contract_code: &self.config.contract_code,
            redirect_url: self.config.redirect_url.as_deref(),
            payment_methods: &request.methods,
        };
        let url = self.url(INIT_TRANSACTION_PATH);
        let created: InitTransactionBody = self
            .authorized(Stage::Charge, |token| {
                self.client.post(&url).bearer_auth(token).json(&body)
            })
            .await?;

        tracing::debug!(
            payment_reference = %created.payment_reference,
            provider_reference = %created.transaction_reference,
            "checkout created"
        );
        Ok(CheckoutHandle {
            provider_reference: created.transaction_reference,
            payment_reference: created.payment_reference,
            checkout_url: created.checkout_url,
        })
    }

    async fn verify_transaction(
        &self,
        provider_reference: &str,
    ) -> Result<Verification, GatewayError> {
        let url = format!(
            "{}/{}",
            self.url(TRANSACTION_STATUS_PATH),
            urlencoding::encode(provider_reference)
        );
        let body: TransactionStatusBody = self
            .authorized(Stage::Verification, |token| {
                self.client.get(&url).bearer_auth(token)
            })
            .await?;

        let amount_paid_minor = body
            .amount_paid
            .as_ref()
            .and_then(wire::to_minor)
            .unwrap_or(0);
        Ok(Verification {
            status: ProviderStatus::from(body.payment_status.as_str()),
            payment_reference: body.payment_reference,
            provider_reference: body.transaction_reference,
            amount_paid_minor,
        })
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        signature::verify(&self.config.secret_key, payload, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let gateway = HttpGateway::with_client(
            Client::new(),
            GatewayConfig::new("https://sandbox.example.com/", "k", "s", "c"),
        );
        assert_eq!(
            gateway.url(LOGIN_PATH),
            "https://sandbox.example.com/api/v1/auth/login"
        );
    }
}
