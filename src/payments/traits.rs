//! Payment provider trait definitions
//!
//! Defines the interface the callback processor and the HTTP layer rely on.

use crate::error::AppResult;
use crate::payments::types::{
    CallbackNotification, CallbackOutcome, PaymentInitiationRequest, RedirectInstruction,
};

/// Trait for redirect-based payment provider implementations
pub trait PaymentProvider: Send + Sync {
    /// Human-readable provider name used in logs
    fn name(&self) -> &'static str;

    /// Build the signed paywall redirect for a validated request
    ///
    /// The returned instruction carries the exact payload bytes that were signed.
    fn initiate_payment(&self, request: &PaymentInitiationRequest)
        -> AppResult<RedirectInstruction>;

    /// Validate a notification signature over the raw request body
    ///
    /// # Arguments
    /// * `payload` - Raw notification body, exactly as received
    /// * `signature` - Signature from the notification header
    fn validate_webhook_signature(&self, payload: &[u8], signature: &str) -> bool;

    /// Classify an already-verified notification
    fn classify_notification(&self, notification: &CallbackNotification) -> CallbackOutcome;
}
