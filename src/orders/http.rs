//! Order store backed by the web app's order API
//!
//! `POST {ORDER_STORE_URL}/orders/{orderId}/payment` with the confirmation as JSON. The API
//! answers `409 Conflict` when the order is already paid.

use super::{MarkPaidOutcome, OrderStore};
use crate::config::OrderStoreConfig;
use crate::error::{AppError, AppResult};
use crate::payments::types::PaymentConfirmation;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{error, info, warn};
use url::Url;

pub struct HttpOrderStore {
    base_url: Url,
    api_key: Option<String>,
    client: Client,
}

impl HttpOrderStore {
    pub fn new(base_url: &str, config: &OrderStoreConfig) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            AppError::configuration(format!("ORDER_STORE_URL is not a valid URL: {}", e))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn payment_endpoint(&self, order_id: &str) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AppError::configuration("ORDER_STORE_URL cannot be used as a base URL")
            })?;
            segments.pop_if_empty().extend(["orders", order_id, "payment"]);
        }
        Ok(url)
    }
}

#[async_trait]
impl OrderStore for HttpOrderStore {
    async fn mark_order_paid(&self, payment: &PaymentConfirmation) -> AppResult<MarkPaidOutcome> {
        let endpoint = self.payment_endpoint(&payment.order_id)?;

        let mut request = self.client.post(endpoint).json(payment);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(
                "Order store request failed: order_id={}, error={}",
                payment.order_id, e
            );
            AppError::order_store(format!("Request failed: {}", e), true)
        })?;

        let status = response.status();
        if status.is_success() {
            info!("Order marked paid: order_id={}", payment.order_id);
            return Ok(MarkPaidOutcome::Updated);
        }
        if status == StatusCode::CONFLICT {
            info!("Order already paid: order_id={}", payment.order_id);
            return Ok(MarkPaidOutcome::AlreadyPaid);
        }

        let body = response.text().await.unwrap_or_default();
        let is_retryable = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
        warn!(
            "Order store rejected payment: order_id={}, status={}, retryable={}",
            payment.order_id, status, is_retryable
        );
        Err(AppError::order_store(
            format!("HTTP {}: {}", status, body),
            is_retryable,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::post;
    use axum::Router;
    use std::time::Duration;

    fn confirmation(order_id: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            order_id: order_id.to_string(),
            charge_id: None,
            transaction_id: Some("t1".to_string()),
            amount: None,
            currency: None,
        }
    }

    fn store_config() -> OrderStoreConfig {
        OrderStoreConfig {
            url: None,
            api_key: Some("store-key".to_string()),
            timeout: Duration::from_secs(2),
        }
    }

    async fn fake_order_api(order_id: Path<String>, headers: HeaderMap) -> AxumStatus {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer store-key")
        {
            return AxumStatus::UNAUTHORIZED;
        }
        match order_id.0.as_str() {
            "ORD-PAID" => AxumStatus::CONFLICT,
            "ORD-DOWN" => AxumStatus::SERVICE_UNAVAILABLE,
            _ => AxumStatus::NO_CONTENT,
        }
    }

    async fn spawn_fake_api() -> String {
        let app = Router::new().route("/api/orders/:order_id/payment", post(fake_order_api));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/", addr)
    }

    #[test]
    fn test_payment_endpoint_encodes_order_id() {
        let store = HttpOrderStore::new("https://app.kaari.ma/api", &store_config()).unwrap();
        let url = store.payment_endpoint("ORD 1/2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://app.kaari.ma/api/orders/ORD%201%2F2/payment"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(HttpOrderStore::new("not a url", &store_config()).is_err());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let base = spawn_fake_api().await;
        let store = HttpOrderStore::new(&base, &store_config()).unwrap();

        assert_eq!(
            store.mark_order_paid(&confirmation("ORD1")).await.unwrap(),
            MarkPaidOutcome::Updated
        );
        assert_eq!(
            store.mark_order_paid(&confirmation("ORD-PAID")).await.unwrap(),
            MarkPaidOutcome::AlreadyPaid
        );

        let err = store
            .mark_order_paid(&confirmation("ORD-DOWN"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retryable() {
        let base = spawn_fake_api().await;
        let config = OrderStoreConfig {
            api_key: None,
            ..store_config()
        };
        let store = HttpOrderStore::new(&base, &config).unwrap();

        let err = store.mark_order_paid(&confirmation("ORD1")).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "ORDER_STORE_ERROR");
    }
}
