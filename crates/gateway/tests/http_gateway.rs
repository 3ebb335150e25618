use std::time::Duration;

use engine::payments::{ChargeRequest, GatewayError, PaymentGateway, ProviderStatus};
use gateway::{GatewayConfig, HttpGateway, signature};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

// base64("key:secret")
const BASIC_AUTH: &str = "Basic a2V5OnNlY3JldA==";

fn gateway_for(server: &MockServer) -> HttpGateway {
    let mut config = GatewayConfig::new(server.uri(), "key", "secret", "CONTRACT1");
    config.redirect_url = Some("https://ridepay.test/funded".to_string());
    config.request_timeout = Duration::from_secs(5);
    HttpGateway::new(config).unwrap()
}

fn login_response(token: &str, expires_in: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "requestSuccessful": true,
        "responseMessage": "success",
        "responseCode": "0",
        "responseBody": { "accessToken": token, "expiresIn": expires_in }
    }))
}

async fn mount_login(server: &MockServer, token: &str, expires_in: u64, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(login_response(token, expires_in))
        .expect(times)
        .mount(server)
        .await;
}

fn charge() -> ChargeRequest {
    ChargeRequest {
        amount_minor: 5050,
        customer_ref: "u1".to_string(),
        customer_name: "Ada Rider".to_string(),
        payment_reference: "PAY_1".to_string(),
        description: "Wallet funding".to_string(),
        methods: vec!["CARD".to_string()],
    }
}

#[tokio::test]
async fn token_is_cached_between_calls() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 300, 1).await;
    let gateway = gateway_for(&server);

    assert_eq!(gateway.authenticate().await.unwrap(), "tok-1");
    assert_eq!(gateway.authenticate().await.unwrap(), "tok-1");
}

#[tokio::test]
async fn token_shorter_than_margin_is_refreshed() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-short", 30, 2).await;
    let gateway = gateway_for(&server);

    gateway.authenticate().await.unwrap();
    gateway.authenticate().await.unwrap();
}

#[tokio::test]
async fn bad_credentials_are_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let gateway = gateway_for(&server);

    let err = gateway.authenticate().await.unwrap_err();
    assert!(matches!(err, GatewayError::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn initiate_charge_sends_major_units_and_bearer() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 300, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/merchant/transactions/init-transaction"))
        .and(header("authorization", "Bearer tok-1"))
        .and(body_partial_json(json!({
            "amount": 50.5,
            "customerName": "Ada Rider",
            "customerEmail": "u1",
            "paymentReference": "PAY_1",
            "paymentDescription": "Wallet funding",
            "currencyCode": "NGN",
            "contractCode": "CONTRACT1",
            "redirectUrl": "https://ridepay.test/funded",
            "paymentMethods": ["CARD"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "requestSuccessful": true,
            "responseMessage": "success",
            "responseBody": {
                "transactionReference": "GW|20260101|1",
                "paymentReference": "PAY_1",
                "checkoutUrl": "https://checkout.test/GW-1",
                "merchantName": "Ridepay"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let gateway = gateway_for(&server);

    let handle = gateway.initiate_charge(charge()).await.unwrap();
    assert_eq!(handle.provider_reference, "GW|20260101|1");
    assert_eq!(handle.payment_reference, "PAY_1");
    assert_eq!(handle.checkout_url, "https://checkout.test/GW-1");
}

#[tokio::test]
async fn unsuccessful_envelope_is_a_charge_error() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 300, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/merchant/transactions/init-transaction"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "requestSuccessful": false,
            "responseMessage": "Duplicate payment reference",
            "responseCode": "99"
        })))
        .mount(&server)
        .await;
    let gateway = gateway_for(&server);

    let err = gateway.initiate_charge(charge()).await.unwrap_err();
    match err {
        GatewayError::Charge(detail) => assert!(detail.contains("Duplicate payment reference")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn verify_transaction_reads_status_and_amount() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 300, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/transactions/GW%7C20260101%7C1"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "requestSuccessful": true,
            "responseMessage": "success",
            "responseBody": {
                "transactionReference": "GW|20260101|1",
                "paymentReference": "PAY_1",
                "amountPaid": "50.50",
                "paymentStatus": "PAID"
            }
        })))
        .mount(&server)
        .await;
    let gateway = gateway_for(&server);

    let verification = gateway.verify_transaction("GW|20260101|1").await.unwrap();
    assert_eq!(verification.status, ProviderStatus::Paid);
    assert_eq!(verification.payment_reference, "PAY_1");
    assert_eq!(verification.provider_reference, "GW|20260101|1");
    assert_eq!(verification.amount_paid_minor, 5050);
}

#[tokio::test]
async fn rejected_token_triggers_one_relogin() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 300, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/transactions/GW-2"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/transactions/GW-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "requestSuccessful": true,
            "responseMessage": "success",
            "responseBody": {
                "transactionReference": "GW-2",
                "paymentReference": "PAY_2",
                "amountPaid": 0,
                "paymentStatus": "PENDING"
            }
        })))
        .mount(&server)
        .await;
    let gateway = gateway_for(&server);

    let verification = gateway.verify_transaction("GW-2").await.unwrap();
    assert_eq!(verification.status, ProviderStatus::Pending);
    assert_eq!(verification.amount_paid_minor, 0);
}

#[tokio::test]
async fn unreachable_provider_is_unavailable() {
    let config = GatewayConfig::new("http://127.0.0.1:9", "key", "secret", "CONTRACT1");
    let gateway = HttpGateway::new(config).unwrap();

    let err = gateway.authenticate().await.unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)), "{err:?}");
}

#[test]
fn webhook_signature_uses_secret_key() {
    let gateway = HttpGateway::new(GatewayConfig::new(
        "http://localhost",
        "key",
        "secret",
        "CONTRACT1",
    ))
    .unwrap();
    let body = br#"{"transactionReference":"GW-1","paymentReference":"PAY_1"}"#;

    let good = signature::sign("secret", body);
    assert!(gateway.verify_webhook_signature(body, &good));
    let other = signature::sign("key", body);
    assert!(!gateway.verify_webhook_signature(body, &other));
}
