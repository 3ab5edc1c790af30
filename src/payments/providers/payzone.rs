//! Payzone paywall provider implementation
//!
//! Payments are started by posting a signed JSON payload to Payzone's hosted paywall from
//! the customer's browser. Outcomes arrive later as signed server-to-server notifications.

use crate::config::PayzoneConfig;
use crate::error::{AppError, AppResult};
use crate::payments::signature::{sign_outbound, verify_inbound};
use crate::payments::traits::PaymentProvider;
use crate::payments::types::{
    CallbackNotification, CallbackOutcome, NotificationStatus, PaymentInitiationRequest,
    RedirectInstruction,
};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const PAYMENT_MODE: &str = "DEEP_LINK";
const PAYMENT_METHOD: &str = "CREDIT_CARD";
const SHOW_PAYMENT_PROFILES: &str = "false";

const STATE_APPROVED: &str = "APPROVED";
const STATE_DECLINED: &str = "DECLINED";

/// Payload posted to the paywall; field order is the serialization order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaywallPayload {
    pub merchant_account: String,
    pub timestamp: i64,
    pub skin: String,
    pub customer_id: String,
    pub customer_country: String,
    pub customer_locale: String,
    pub charge_id: String,
    pub order_id: String,
    pub price: String,
    pub currency: String,
    pub description: String,
    pub mode: String,
    pub payment_method: String,
    pub show_payment_profiles: String,
    pub callback_url: String,
    pub success_url: String,
    pub failure_url: String,
    pub cancel_url: String,
}

/// `redirect_url` with its query and fragment replaced by `status=<status>`
pub fn derive_return_url(redirect_url: &str, status: &str) -> AppResult<String> {
    let mut url = Url::parse(redirect_url).map_err(|e| {
        AppError::validation(
            format!("redirectURL is not a valid URL: {}", e),
            vec!["redirectURL".to_string()],
        )
    })?;
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut().append_pair("status", status);
    Ok(url.to_string())
}

/// Payzone payment provider
pub struct PayzoneProvider {
    config: PayzoneConfig,
}

impl PayzoneProvider {
    /// Create a new Payzone provider instance
    pub fn new(config: PayzoneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PayzoneConfig {
        &self.config
    }

    /// Assemble the paywall payload for one initiation attempt
    ///
    /// `attempt_id` makes `customerId` and `chargeId` unique even when two attempts share
    /// the same `timestamp`.
    pub fn build_payload(
        &self,
        request: &PaymentInitiationRequest,
        timestamp: i64,
        attempt_id: Uuid,
    ) -> AppResult<PaywallPayload> {
        let attempt = attempt_id.simple();
        let description = request
            .description()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Payment for order {}", request.order_id));

        Ok(PaywallPayload {
            merchant_account: self.config.merchant_account.clone(),
            timestamp,
            skin: self.config.skin.clone(),
            customer_id: format!("cust_{}_{}", timestamp, attempt),
            customer_country: self.config.customer_country.clone(),
            customer_locale: self.config.customer_locale.clone(),
            charge_id: format!("charge_{}_{}", timestamp, attempt),
            order_id: request.order_id.clone(),
            price: request.amount.to_string(),
            currency: request
                .currency
                .clone()
                .unwrap_or_else(|| self.config.default_currency.clone()),
            description,
            mode: PAYMENT_MODE.to_string(),
            payment_method: PAYMENT_METHOD.to_string(),
            show_payment_profiles: SHOW_PAYMENT_PROFILES.to_string(),
            callback_url: request.callback_url.clone(),
            success_url: request.redirect_url.clone(),
            failure_url: derive_return_url(&request.redirect_url, "failed")?,
            cancel_url: derive_return_url(&request.redirect_url, "cancelled")?,
        })
    }

    /// Serialize once and sign those exact bytes
    pub fn sign_payload(&self, payload: &PaywallPayload) -> AppResult<RedirectInstruction> {
        let serialized = serde_json::to_string(payload)?;
        let signature = sign_outbound(&self.config.paywall_secret_key, serialized.as_bytes());

        Ok(RedirectInstruction {
            action_url: self.config.paywall_url.clone(),
            payload: serialized,
            signature,
        })
    }
}

impl PaymentProvider for PayzoneProvider {
    fn name(&self) -> &'static str {
        "Payzone"
    }

    fn initiate_payment(
        &self,
        request: &PaymentInitiationRequest,
    ) -> AppResult<RedirectInstruction> {
        let timestamp = chrono::Utc::now().timestamp();
        let payload = self.build_payload(request, timestamp, Uuid::new_v4())?;
        let instruction = self.sign_payload(&payload)?;

        info!(
            "Payzone payment initiated: order_id={}, amount={} {}, charge_id={}",
            payload.order_id, payload.price, payload.currency, payload.charge_id
        );

        Ok(instruction)
    }

    fn validate_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        verify_inbound(&self.config.notification_key, payload, signature)
    }

    fn classify_notification(&self, notification: &CallbackNotification) -> CallbackOutcome {
        match notification.status() {
            NotificationStatus::Charged => {
                // First approved transaction is authoritative, later ones are ignored
                match notification
                    .transactions
                    .iter()
                    .position(|t| t.state == STATE_APPROVED)
                {
                    Some(index) => {
                        let result_code = notification.transactions[index].result_code;
                        if result_code == Some(0) {
                            CallbackOutcome::ChargedApproved {
                                transaction_index: index,
                            }
                        } else {
                            CallbackOutcome::ChargedUnapproved {
                                transaction_index: Some(index),
                                result_code,
                            }
                        }
                    }
                    None => CallbackOutcome::ChargedUnapproved {
                        transaction_index: None,
                        result_code: None,
                    },
                }
            }
            NotificationStatus::Declined => {
                let index = notification
                    .transactions
                    .iter()
                    .position(|t| t.state == STATE_DECLINED);
                if let Some(i) = index {
                    debug!(
                        "Declined transaction: order_id={:?}, result_message={:?}",
                        notification.order_id, notification.transactions[i].result_message
                    );
                }
                CallbackOutcome::Declined {
                    transaction_index: index,
                    result_code: index.and_then(|i| notification.transactions[i].result_code),
                }
            }
            NotificationStatus::Other(status) => CallbackOutcome::Other { status },
        }
    }
}
