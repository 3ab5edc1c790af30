//! Order store collaborator
//!
//! The gateway owns no booking state. When a charge is confirmed it asks an order store to
//! record the payment. Stores must make `mark_order_paid` idempotent per `order_id`: the
//! provider may deliver the same notification more than once, in any order.

pub mod http;
pub mod in_memory;

pub use self::http::HttpOrderStore;
pub use self::in_memory::InMemoryOrderStore;

use crate::config::OrderStoreConfig;
use crate::error::AppResult;
use crate::payments::types::PaymentConfirmation;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of recording a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPaidOutcome {
    /// The order transitioned to paid
    Updated,
    /// The order was already paid; nothing changed
    AlreadyPaid,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Record a confirmed payment. Repeated calls for the same order are no-ops.
    async fn mark_order_paid(&self, payment: &PaymentConfirmation) -> AppResult<MarkPaidOutcome>;
}

/// Order store selected by configuration: HTTP when `ORDER_STORE_URL` is set, in-memory otherwise
pub fn from_config(config: &OrderStoreConfig) -> AppResult<Arc<dyn OrderStore>> {
    match &config.url {
        Some(url) => Ok(Arc::new(HttpOrderStore::new(url, config)?)),
        None => Ok(Arc::new(InMemoryOrderStore::new())),
    }
}
