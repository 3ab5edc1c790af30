//! Payment endpoints
//!
//! `initiate` answers the web app with real HTTP errors. `callback` answers the provider and
//! always uses HTTP 200; the business outcome travels in the body.

use super::AppState;
use crate::error::AppError;
use crate::payments::types::{
    CallbackAcknowledgement, InitiatePaymentBody, PaymentInitiationRequest,
};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::Json;
use serde::Serialize;
use tracing::{error, info, warn};

pub const CALLBACK_SIGNATURE_HEADER: &str = "x-callback-signature";

/// Upper bound on notification bodies read into memory
pub const MAX_CALLBACK_BODY_BYTES: usize = 1024 * 1024;

pub async fn initiate_payment(
    State(state): State<AppState>,
    body: Result<Json<InitiatePaymentBody>, JsonRejection>,
) -> Result<Html<String>, AppError> {
    let Json(body) = body.map_err(|rejection| {
        warn!("Rejected initiation body: {}", rejection.body_text());
        AppError::validation(
            format!("Invalid request body: {}", rejection.body_text()),
            Vec::new(),
        )
    })?;

    let request = PaymentInitiationRequest::try_from(body).map_err(|e| {
        warn!("Rejected payment initiation: {}", e);
        e
    })?;

    let instruction = state.provider.initiate_payment(&request).map_err(|e| {
        if e.is_client_error() {
            warn!("Rejected payment initiation: order_id={}, {}", request.order_id, e);
        } else {
            error!("Payment initiation failed: order_id={}, {}", request.order_id, e);
        }
        e.with_context(format!("order {}", request.order_id))
    })?;

    info!(
        "Redirecting customer to {} paywall: order_id={}",
        state.provider.name(),
        request.order_id
    );
    Ok(Html(instruction.to_html()))
}

pub async fn payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> (StatusCode, Json<CallbackAcknowledgement>) {
    let signature = headers
        .get(CALLBACK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    // Raw bytes are needed for the HMAC; never parse before verifying
    let raw_body = match axum::body::to_bytes(body, MAX_CALLBACK_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Unreadable notification body: {}", e);
            return (
                StatusCode::OK,
                Json(CallbackAcknowledgement::ko("Unreadable notification body")),
            );
        }
    };

    let acknowledgement = state.callbacks.handle_callback(&raw_body, signature).await;
    (StatusCode::OK, Json(acknowledgement))
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "orderID")]
    pub order_id: String,
}

/// The paywall has no polling API; status is only ever learned from callbacks
pub async fn payment_status(Path(order_id): Path<String>) -> Json<PaymentStatusResponse> {
    Json(PaymentStatusResponse {
        success: true,
        message: "Payment status is reported asynchronously through provider callbacks"
            .to_string(),
        order_id,
    })
}
