//! Payment gateway types and data structures
//!
//! Request, redirect and callback shapes shared by the HTTP layer, the provider and the
//! callback processor.

use crate::error::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use url::Url;

/// Amount in the provider's expected unit, kept in the textual form it is transmitted in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Amount {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain positive decimal in standard form: `int[.frac]`, digits on both sides of the
    /// point, no leading zeros, no sign or exponent
    pub fn is_positive_decimal(&self) -> bool {
        let (int_part, frac_part) = match self.0.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (self.0.as_str(), None),
        };

        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || (int_part.len() > 1 && int_part.starts_with('0')) {
            return false;
        }
        if let Some(frac) = frac_part {
            if !all_digits(frac) {
                return false;
            }
        }

        self.0.bytes().any(|b| matches!(b, b'1'..=b'9'))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match RawAmount::deserialize(deserializer)? {
            RawAmount::Number(n) => Amount::new(n.to_string()),
            RawAmount::Text(s) => Amount::new(s),
        })
    }
}

/// Body of `POST /api/payments/initiate` as sent by the web app
///
/// Every field is optional here so that absent fields surface as one validation error
/// instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiatePaymentBody {
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "orderID", alias = "orderId")]
    pub order_id: Option<String>,
    #[serde(default, rename = "customerEmail")]
    pub customer_email: Option<String>,
    #[serde(default, rename = "customerName")]
    pub customer_name: Option<String>,
    #[serde(default, rename = "redirectURL", alias = "redirectUrl")]
    pub redirect_url: Option<String>,
    #[serde(default, rename = "callbackURL", alias = "callbackUrl")]
    pub callback_url: Option<String>,
    #[serde(default, rename = "customData")]
    pub custom_data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Validated payment initiation request
#[derive(Debug, Clone)]
pub struct PaymentInitiationRequest {
    pub amount: Amount,
    /// Currency code; the provider default applies when absent
    pub currency: Option<String>,
    /// Merchant-assigned booking attempt identifier
    pub order_id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    /// Where the customer's browser lands after a successful payment
    pub redirect_url: String,
    /// Where the provider posts server-to-server notifications
    pub callback_url: String,
    pub custom_data: serde_json::Map<String, serde_json::Value>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PaymentInitiationRequest {
    /// Free-form description supplied by the merchant, if any
    pub fn description(&self) -> Option<&str> {
        self.custom_data
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl TryFrom<InitiatePaymentBody> for PaymentInitiationRequest {
    type Error = AppError;

    fn try_from(body: InitiatePaymentBody) -> Result<Self, Self::Error> {
        let amount = body.amount.filter(|a| !a.is_blank());
        let order_id = present(body.order_id);
        let customer_email = present(body.customer_email);
        let redirect_url = present(body.redirect_url);
        let callback_url = present(body.callback_url);

        let mut missing = Vec::new();
        if amount.is_none() {
            missing.push("amount".to_string());
        }
        if order_id.is_none() {
            missing.push("orderID".to_string());
        }
        if customer_email.is_none() {
            missing.push("customerEmail".to_string());
        }
        if redirect_url.is_none() {
            missing.push("redirectURL".to_string());
        }
        if callback_url.is_none() {
            missing.push("callbackURL".to_string());
        }

        let (Some(amount), Some(order_id), Some(customer_email), Some(redirect_url), Some(callback_url)) =
            (amount, order_id, customer_email, redirect_url, callback_url)
        else {
            return Err(AppError::missing_fields(missing));
        };

        if !amount.is_positive_decimal() {
            return Err(AppError::validation(
                format!("amount must be a positive decimal, got '{}'", amount),
                vec!["amount".to_string()],
            ));
        }

        for (field, value) in [("redirectURL", &redirect_url), ("callbackURL", &callback_url)] {
            let is_web_url = Url::parse(value)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !is_web_url {
                return Err(AppError::validation(
                    format!("{} must be an absolute http(s) URL", field),
                    vec![field.to_string()],
                ));
            }
        }

        Ok(Self {
            amount,
            currency: present(body.currency),
            order_id,
            customer_email,
            customer_name: present(body.customer_name),
            redirect_url,
            callback_url,
            custom_data: body.custom_data.unwrap_or_default(),
        })
    }
}

/// Browser instructions for reaching the hosted paywall
///
/// `payload` holds the exact string that was signed; it is placed into the form verbatim
/// (entity-escaped) so the browser submits the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectInstruction {
    pub action_url: String,
    pub payload: String,
    pub signature: String,
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl RedirectInstruction {
    /// Auto-submitting POST form targeting the paywall
    pub fn to_html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Redirecting to payment</title>
</head>
<body onload="document.getElementById('paywall-form').submit()">
<form id="paywall-form" method="POST" action="{action}" accept-charset="UTF-8">
<input type="hidden" name="payload" value="{payload}">
<input type="hidden" name="signature" value="{signature}">
<noscript><button type="submit">Continue to payment</button></noscript>
</form>
</body>
</html>
"#,
            action = escape_attribute(&self.action_url),
            payload = escape_attribute(&self.payload),
            signature = escape_attribute(&self.signature),
        )
    }
}

/// Notification status as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Charged,
    Declined,
    Other(String),
}

impl From<&str> for NotificationStatus {
    fn from(value: &str) -> Self {
        match value {
            "CHARGED" => NotificationStatus::Charged,
            "DECLINED" => NotificationStatus::Declined,
            other => NotificationStatus::Other(other.to_string()),
        }
    }
}

fn deserialize_result_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    // Unreadable codes count as absent; one odd record must not void the notification
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Echoed identifiers arrive as strings or numbers; anything else is dropped
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn deserialize_state<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_lenient_string(deserializer)?.unwrap_or_default())
}

/// One transaction record inside a provider notification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackTransaction {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_state")]
    pub state: String,
    #[serde(default, deserialize_with = "deserialize_result_code")]
    pub result_code: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub result_message: Option<String>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub currency: Option<String>,
}

/// Asynchronous notification posted by the provider
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackNotification {
    /// Provider charge identifier
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub id: Option<String>,
    /// Echo of the merchant order id
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub order_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub transactions: Vec<CallbackTransaction>,
}

impl CallbackNotification {
    pub fn status(&self) -> NotificationStatus {
        NotificationStatus::from(self.status.as_str())
    }
}

/// Business classification of a verified notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// `CHARGED` with an authoritative approved transaction and result code 0
    ChargedApproved { transaction_index: usize },
    /// `CHARGED` without an approved transaction, or with a non-zero result code
    ChargedUnapproved {
        transaction_index: Option<usize>,
        result_code: Option<i64>,
    },
    /// `DECLINED`; the index points at the first declined transaction, for diagnostics
    Declined {
        transaction_index: Option<usize>,
        result_code: Option<i64>,
    },
    /// A status this integration does not act on
    Other { status: String },
}

/// Signature check plus classification of one inbound request; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackVerification {
    pub signature_valid: bool,
    pub outcome: Option<CallbackOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AckStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "KO")]
    Ko,
}

/// Response body returned to the provider, always with HTTP 200
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackAcknowledgement {
    pub status: AckStatus,
    pub message: String,
}

impl CallbackAcknowledgement {
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self {
            status: AckStatus::Ok,
            message: message.into(),
        }
    }

    pub fn ko<S: Into<String>>(message: S) -> Self {
        Self {
            status: AckStatus::Ko,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AckStatus::Ok
    }
}

/// What the order store receives when a charge is confirmed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub charge_id: Option<String>,
    pub transaction_id: Option<String>,
    pub amount: Option<serde_json::Value>,
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_body() -> InitiatePaymentBody {
        serde_json::from_value(json!({
            "amount": 100,
            "orderID": "ORD1",
            "customerEmail": "a@b.com",
            "customerName": "Amina",
            "redirectURL": "https://app/x",
            "callbackURL": "https://gw/cb",
            "customData": { "description": "Room 12" }
        }))
        .unwrap()
    }

    #[test]
    fn test_amount_accepts_numbers_and_strings() {
        let numeric: Amount = serde_json::from_value(json!(100)).unwrap();
        let fractional: Amount = serde_json::from_value(json!(99.5)).unwrap();
        let text: Amount = serde_json::from_value(json!(" 250.00 ")).unwrap();
        assert_eq!(numeric.as_str(), "100");
        assert_eq!(fractional.as_str(), "99.5");
        assert_eq!(text.as_str(), "250.00");
    }

    #[test]
    fn test_amount_positive_decimal() {
        assert!(Amount::new("100").is_positive_decimal());
        assert!(Amount::new("0.01").is_positive_decimal());
        assert!(!Amount::new("0").is_positive_decimal());
        assert!(!Amount::new("0.00").is_positive_decimal());
        assert!(!Amount::new("-5").is_positive_decimal());
        assert!(!Amount::new("1e3").is_positive_decimal());
        assert!(!Amount::new("1.2.3").is_positive_decimal());
        assert!(!Amount::new("abc").is_positive_decimal());
        assert!(!Amount::new(".").is_positive_decimal());
    }

    #[test]
    fn test_amount_requires_standard_form() {
        assert!(Amount::new("0.5").is_positive_decimal());
        assert!(Amount::new("100.00").is_positive_decimal());
        assert!(Amount::new("10").is_positive_decimal());
        assert!(!Amount::new("1.").is_positive_decimal());
        assert!(!Amount::new(".5").is_positive_decimal());
        assert!(!Amount::new("007").is_positive_decimal());
        assert!(!Amount::new("00.5").is_positive_decimal());
        assert!(!Amount::new("1 000").is_positive_decimal());
    }

    #[test]
    fn test_valid_body_converts() {
        let request = PaymentInitiationRequest::try_from(full_body()).unwrap();
        assert_eq!(request.order_id, "ORD1");
        assert_eq!(request.amount.as_str(), "100");
        assert_eq!(request.currency, None);
        assert_eq!(request.description(), Some("Room 12"));
    }

    #[test]
    fn test_each_required_field_is_enforced() {
        let cases: [(&str, fn(&mut InitiatePaymentBody)); 5] = [
            ("amount", |b: &mut InitiatePaymentBody| b.amount = None),
            ("orderID", |b: &mut InitiatePaymentBody| b.order_id = None),
            ("customerEmail", |b: &mut InitiatePaymentBody| b.customer_email = None),
            ("redirectURL", |b: &mut InitiatePaymentBody| b.redirect_url = None),
            ("callbackURL", |b: &mut InitiatePaymentBody| b.callback_url = None),
        ];

        for (field, strip) in cases {
            let mut body = full_body();
            strip(&mut body);
            let err = PaymentInitiationRequest::try_from(body).unwrap_err();
            assert!(err.is_client_error(), "{} should be a client error", field);
            assert!(
                err.to_string().contains(field),
                "error for missing {} was: {}",
                field,
                err
            );
        }
    }

    #[test]
    fn test_blank_strings_count_as_missing() {
        let mut body = full_body();
        body.order_id = Some("   ".to_string());
        body.customer_email = Some(String::new());
        let err = PaymentInitiationRequest::try_from(body).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: orderID, customerEmail");
    }

    #[test]
    fn test_relative_redirect_url_is_rejected() {
        let mut body = full_body();
        body.redirect_url = Some("/bookings/done".to_string());
        let err = PaymentInitiationRequest::try_from(body).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("redirectURL"));
    }

    #[test]
    fn test_non_web_url_schemes_are_rejected() {
        let cases: [(&str, &str, fn(&mut InitiatePaymentBody, String)); 4] = [
            ("redirectURL", "javascript:alert(1)", |b: &mut InitiatePaymentBody, v| {
                b.redirect_url = Some(v)
            }),
            ("redirectURL", "ftp://app/done", |b: &mut InitiatePaymentBody, v| {
                b.redirect_url = Some(v)
            }),
            ("callbackURL", "ftp://gw/cb", |b: &mut InitiatePaymentBody, v| {
                b.callback_url = Some(v)
            }),
            ("callbackURL", "data:text/plain,hi", |b: &mut InitiatePaymentBody, v| {
                b.callback_url = Some(v)
            }),
        ];

        for (field, value, set) in cases {
            let mut body = full_body();
            set(&mut body, value.to_string());
            let err = PaymentInitiationRequest::try_from(body).unwrap_err();
            assert!(err.is_client_error(), "{} should be rejected", value);
            assert!(err.to_string().contains(field), "error for {} was: {}", value, err);
        }

        let mut body = full_body();
        body.redirect_url = Some("http://localhost:3000/bookings/done".to_string());
        assert!(PaymentInitiationRequest::try_from(body).is_ok());
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let mut body = full_body();
        body.amount = Some(Amount::new("-10"));
        let err = PaymentInitiationRequest::try_from(body).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_html_form_escapes_payload() {
        let instruction = RedirectInstruction {
            action_url: "https://pay.example/launch".to_string(),
            payload: r#"{"description":"Tom & Jerry's <room>"}"#.to_string(),
            signature: "abc123".to_string(),
        };
        let html = instruction.to_html();
        assert!(html.contains(r#"action="https://pay.example/launch""#));
        assert!(html.contains(
            r#"value="{&quot;description&quot;:&quot;Tom &amp; Jerry&#39;s &lt;room&gt;&quot;}""#
        ));
        assert!(html.contains(r#"name="signature" value="abc123""#));
    }

    #[test]
    fn test_notification_parses_string_result_codes() {
        let notification: CallbackNotification = serde_json::from_value(json!({
            "id": "charge-1",
            "orderId": "ORD1",
            "status": "CHARGED",
            "transactions": [
                { "id": "t1", "state": "APPROVED", "resultCode": "0" },
                { "id": "t2", "state": "APPROVED", "resultCode": 5 },
                { "id": "t3", "state": "APPROVED" }
            ]
        }))
        .unwrap();

        assert_eq!(notification.status(), NotificationStatus::Charged);
        assert_eq!(notification.transactions[0].result_code, Some(0));
        assert_eq!(notification.transactions[1].result_code, Some(5));
        assert_eq!(notification.transactions[2].result_code, None);
    }

    #[test]
    fn test_notification_accepts_numeric_identifiers() {
        let notification: CallbackNotification = serde_json::from_value(json!({
            "id": 42,
            "orderId": "ORD1",
            "status": "CHARGED",
            "transactions": [
                { "id": 987654, "state": "APPROVED", "resultCode": 0, "currency": 504 }
            ]
        }))
        .unwrap();

        assert_eq!(notification.id.as_deref(), Some("42"));
        assert_eq!(notification.transactions[0].id.as_deref(), Some("987654"));
        assert_eq!(notification.transactions[0].currency.as_deref(), Some("504"));
        assert_eq!(notification.transactions[0].result_code, Some(0));
    }

    #[test]
    fn test_unreadable_fields_do_not_void_notification() {
        let notification: CallbackNotification = serde_json::from_value(json!({
            "id": { "nested": true },
            "orderId": "ORD1",
            "status": "CHARGED",
            "transactions": [
                { "state": "APPROVED", "resultCode": 0 },
                { "id": [1, 2], "state": "DECLINED", "resultCode": { "x": 1 }, "resultMessage": 7 },
                { "state": "APPROVED", "resultCode": 1.5 }
            ]
        }))
        .unwrap();

        assert_eq!(notification.id, None);
        assert_eq!(notification.transactions[0].result_code, Some(0));
        assert_eq!(notification.transactions[1].id, None);
        assert_eq!(notification.transactions[1].result_code, None);
        assert_eq!(notification.transactions[1].result_message.as_deref(), Some("7"));
        assert_eq!(notification.transactions[2].result_code, None);
    }

    #[test]
    fn test_acknowledgement_serialization() {
        let ack = serde_json::to_value(CallbackAcknowledgement::ko("Invalid signature")).unwrap();
        assert_eq!(ack, json!({ "status": "KO", "message": "Invalid signature" }));
    }
}
