//! Provider notification handling
//!
//! A notification moves through: received, signature verified or rejected, classified,
//! acknowledged. Every path ends in an acknowledgement. Nothing here returns an error to
//! the transport, because the provider retries non-200 responses without bound.

use crate::error::AppError;
use crate::orders::{MarkPaidOutcome, OrderStore};
use crate::payments::traits::PaymentProvider;
use crate::payments::types::{
    CallbackAcknowledgement, CallbackNotification, CallbackOutcome, CallbackVerification,
    PaymentConfirmation,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

enum Inspection {
    SignatureRejected,
    Malformed(String),
    Verified {
        notification: CallbackNotification,
        outcome: CallbackOutcome,
    },
}

pub struct CallbackProcessor {
    provider: Arc<dyn PaymentProvider>,
    orders: Arc<dyn OrderStore>,
    store_timeout: Duration,
}

impl CallbackProcessor {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        orders: Arc<dyn OrderStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            orders,
            store_timeout,
        }
    }

    fn inspect(&self, raw_body: &[u8], provided_signature: Option<&str>) -> Inspection {
        let signature = provided_signature.unwrap_or_default();
        if !self.provider.validate_webhook_signature(raw_body, signature) {
            return Inspection::SignatureRejected;
        }

        match serde_json::from_slice::<CallbackNotification>(raw_body) {
            Ok(notification) => {
                let outcome = self.provider.classify_notification(&notification);
                Inspection::Verified {
                    notification,
                    outcome,
                }
            }
            Err(e) => Inspection::Malformed(e.to_string()),
        }
    }

    /// Signature check and classification without side effects
    pub fn verify(&self, raw_body: &[u8], provided_signature: Option<&str>) -> CallbackVerification {
        match self.inspect(raw_body, provided_signature) {
            Inspection::SignatureRejected => CallbackVerification {
                signature_valid: false,
                outcome: None,
            },
            Inspection::Malformed(_) => CallbackVerification {
                signature_valid: true,
                outcome: None,
            },
            Inspection::Verified { outcome, .. } => CallbackVerification {
                signature_valid: true,
                outcome: Some(outcome),
            },
        }
    }

    /// Verify, classify and reconcile one notification
    ///
    /// `raw_body` must be the untouched request body; the signature is computed over it.
    pub async fn handle_callback(
        &self,
        raw_body: &[u8],
        provided_signature: Option<&str>,
    ) -> CallbackAcknowledgement {
        match self.inspect(raw_body, provided_signature) {
            Inspection::SignatureRejected => {
                warn!(
                    provider = self.provider.name(),
                    body_len = raw_body.len(),
                    signature_present = provided_signature.is_some(),
                    "Rejected notification with invalid signature"
                );
                CallbackAcknowledgement::ko("Invalid signature")
            }
            Inspection::Malformed(reason) => {
                warn!(
                    provider = self.provider.name(),
                    "Malformed notification body: {}", reason
                );
                CallbackAcknowledgement::ko("Malformed notification")
            }
            Inspection::Verified {
                notification,
                outcome,
            } => self.reconcile(notification, outcome).await,
        }
    }

    async fn reconcile(
        &self,
        notification: CallbackNotification,
        outcome: CallbackOutcome,
    ) -> CallbackAcknowledgement {
        let order_id = notification
            .order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        match outcome {
            CallbackOutcome::ChargedApproved { transaction_index } => {
                let Some(order_id) = order_id else {
                    error!("Approved charge without orderId: charge_id={:?}", notification.id);
                    return CallbackAcknowledgement::ko("Missing orderId");
                };

                let transaction = &notification.transactions[transaction_index];
                let confirmation = PaymentConfirmation {
                    order_id,
                    charge_id: notification.id.clone(),
                    transaction_id: transaction.id.clone(),
                    amount: transaction.amount.clone(),
                    currency: transaction.currency.clone(),
                };

                info!(
                    "Payment approved: order_id={}, transaction_index={}",
                    confirmation.order_id, transaction_index
                );
                self.mark_paid(confirmation).await
            }
            CallbackOutcome::ChargedUnapproved {
                transaction_index,
                result_code,
            } => {
                info!(
                    "Charge not approved: order_id={:?}, transaction_index={:?}, result_code={:?}",
                    order_id, transaction_index, result_code
                );
                CallbackAcknowledgement::ko("Payment not approved")
            }
            CallbackOutcome::Declined {
                transaction_index,
                result_code,
            } => {
                info!(
                    "Payment declined: order_id={:?}, transaction_index={:?}, result_code={:?}",
                    order_id, transaction_index, result_code
                );
                CallbackAcknowledgement::ko("Payment declined")
            }
            CallbackOutcome::Other { status } => {
                info!(
                    "Unhandled notification status acknowledged: order_id={:?}, status={}",
                    order_id, status
                );
                CallbackAcknowledgement::ok("Notification received")
            }
        }
    }

    /// Runs the store update on its own task so that a slow store cannot hold the
    /// acknowledgement past `store_timeout`; a late update still completes in the background.
    async fn mark_paid(&self, confirmation: PaymentConfirmation) -> CallbackAcknowledgement {
        let orders = Arc::clone(&self.orders);
        let order_id = confirmation.order_id.clone();
        let task = tokio::spawn(async move { orders.mark_order_paid(&confirmation).await });

        let result = match tokio::time::timeout(self.store_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AppError::internal(format!(
                "order update task aborted: {}",
                join_error
            ))),
            Err(_) => Err(AppError::timeout(
                "order store",
                self.store_timeout.as_millis() as u64,
            )),
        };

        match result {
            Ok(MarkPaidOutcome::Updated) => {
                CallbackAcknowledgement::ok("Status recorded successfully")
            }
            Ok(MarkPaidOutcome::AlreadyPaid) => {
                info!("Duplicate notification for paid order: order_id={}", order_id);
                CallbackAcknowledgement::ok("Status already recorded")
            }
            Err(e) => {
                error!(
                    "Failed to mark order paid: order_id={}, retryable={}, error={}",
                    order_id,
                    e.is_retryable(),
                    e
                );
                if e.is_timeout() {
                    CallbackAcknowledgement::ko("Order update timed out")
                } else {
                    CallbackAcknowledgement::ko("Order update failed")
                }
            }
        }
    }
}
