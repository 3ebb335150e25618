//! Provider JSON shapes.
//!
//! Every response is wrapped in an envelope; amounts are in major units.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope<T> {
    pub request_successful: bool,
    #[serde(default)]
    pub response_message: String,
    pub response_body: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginBody {
    pub access_token: String,
    /// Seconds.
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitTransaction<'a> {
    pub amount: f64,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub payment_reference: &'a str,
    pub payment_description: &'a str,
    pub currency_code: &'static str,
    pub contract_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub payment_methods: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitTransactionBody {
    pub transaction_reference: String,
    pub payment_reference: String,
    pub checkout_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionStatusBody {
    pub transaction_reference: String,
    pub payment_reference: String,
    #[serde(default)]
    pub amount_paid: Option<serde_json::Value>,
    pub payment_status: String,
}

/// Minor units to the provider's decimal major units.
pub(crate) fn to_major(amount_minor: i64) -> f64 {
    amount_minor as f64 / 100.0
}

/// Reads an amount sent either as a JSON number or a decimal string.
pub(crate) fn to_minor(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(|major| (major * 100.0).round() as i64),
        serde_json::Value::String(s) => s.parse::<engine::Money>().ok().map(engine::Money::minor),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn amounts_convert_at_the_boundary() {
        assert_eq!(to_major(123_456), 1234.56);
        assert_eq!(to_minor(&json!(1234.56)), Some(123_456));
        assert_eq!(to_minor(&json!(50)), Some(5000));
        assert_eq!(to_minor(&json!("1,000.50")), Some(100_050));
        assert_eq!(to_minor(&json!(null)), None);
        assert_eq!(to_minor(&json!("abc")), None);
    }

    #[test]
    fn init_request_skips_empty_optionals() {
        let body = InitTransaction {
            amount: 50.0,
            customer_name: "Ada",
            customer_email: "u1",
            payment_reference: "PAY_1",
            payment_description: "Top up",
            currency_code: "NGN",
            contract_code: "C1",
            redirect_url: None,
            payment_methods: &[],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["paymentReference"], "PAY_1");
        assert_eq!(value["amount"], 50.0);
        assert!(value.get("redirectUrl").is_none());
        assert!(value.get("paymentMethods").is_none());
    }
}
