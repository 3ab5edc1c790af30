//! HashMap-backed order store for development and tests.

use super::{MarkPaidOutcome, OrderStore};
use crate::error::AppResult;
use crate::payments::types::PaymentConfirmation;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct PaidOrder {
    pub confirmation: PaymentConfirmation,
    pub paid_at: DateTime<Utc>,
}

/// Clone-friendly via Arc; clones share the same orders.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    paid: Arc<RwLock<HashMap<String, PaidOrder>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: &str) -> Option<PaidOrder> {
        self.paid.read().await.get(order_id).cloned()
    }

    pub async fn is_paid(&self, order_id: &str) -> bool {
        self.paid.read().await.contains_key(order_id)
    }

    pub async fn paid_count(&self) -> usize {
        self.paid.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn mark_order_paid(&self, payment: &PaymentConfirmation) -> AppResult<MarkPaidOutcome> {
        let mut paid = self.paid.write().await;
        if paid.contains_key(&payment.order_id) {
            debug!("Order already paid: order_id={}", payment.order_id);
            return Ok(MarkPaidOutcome::AlreadyPaid);
        }

        paid.insert(
            payment.order_id.clone(),
            PaidOrder {
                confirmation: payment.clone(),
                paid_at: Utc::now(),
            },
        );
        Ok(MarkPaidOutcome::Updated)
    }
}
