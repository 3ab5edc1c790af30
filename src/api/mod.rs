//! HTTP surface of the gateway

pub mod health;
pub mod payments;

use crate::config::Config;
use crate::orders::OrderStore;
use crate::payments::callback::CallbackProcessor;
use crate::payments::providers::PayzoneProvider;
use crate::payments::traits::PaymentProvider;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Shared, immutable per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub provider: Arc<dyn PaymentProvider>,
    pub callbacks: Arc<CallbackProcessor>,
}

impl AppState {
    pub fn new(config: Config, orders: Arc<dyn OrderStore>) -> Self {
        let provider: Arc<dyn PaymentProvider> =
            Arc::new(PayzoneProvider::new(config.payzone.clone()));
        let callbacks = Arc::new(CallbackProcessor::new(
            Arc::clone(&provider),
            orders,
            config.order_store.timeout,
        ));

        Self {
            config,
            provider,
            callbacks,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/payments/initiate", post(payments::initiate_payment))
        .route("/api/payments/callback", post(payments::payment_callback))
        .route("/api/payments/status/:order_id", get(payments::payment_status))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
