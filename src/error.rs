//! Application error taxonomy
//!
//! Errors raised on the merchant-facing side (payment initiation) are rendered as real HTTP
//! errors. The provider-facing callback path never renders these; it folds them into a `KO`
//! acknowledgement instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Failures of the service's own plumbing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InfrastructureError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failures of collaborators outside this service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalError {
    #[error("Order store error: {message}")]
    OrderStore { message: String, is_retryable: bool },

    #[error("{service} did not respond within {millis} ms")]
    Timeout { service: String, millis: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    /// The caller sent a request we cannot act on
    Validation {
        message: String,
        fields: Vec<String>,
    },
    Infrastructure(InfrastructureError),
    External(ExternalError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn validation<S: Into<String>>(message: S, fields: Vec<String>) -> Self {
        Self::new(AppErrorKind::Validation {
            message: message.into(),
            fields,
        })
    }

    /// Rejection listing every required field that was absent or blank
    pub fn missing_fields(fields: Vec<String>) -> Self {
        let message = format!("Missing required fields: {}", fields.join(", "));
        Self::validation(message, fields)
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: message.into(),
            },
        ))
    }

    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Serialization {
                message: message.into(),
            },
        ))
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(AppErrorKind::Infrastructure(InfrastructureError::Internal {
            message: message.into(),
        }))
    }

    pub fn order_store<S: Into<String>>(message: S, is_retryable: bool) -> Self {
        Self::new(AppErrorKind::External(ExternalError::OrderStore {
            message: message.into(),
            is_retryable,
        }))
    }

    pub fn timeout<S: Into<String>>(service: S, millis: u64) -> Self {
        Self::new(AppErrorKind::External(ExternalError::Timeout {
            service: service.into(),
            millis,
        }))
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.kind, AppErrorKind::Validation { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, AppErrorKind::External(ExternalError::Timeout { .. }))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::External(ExternalError::OrderStore {
                is_retryable: true,
                ..
            }) | AppErrorKind::External(ExternalError::Timeout { .. })
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.kind {
            AppErrorKind::Validation { .. } => StatusCode::BAD_REQUEST,
            AppErrorKind::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppErrorKind::External(ExternalError::OrderStore { .. }) => StatusCode::BAD_GATEWAY,
            AppErrorKind::External(ExternalError::Timeout { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
        }
    }

    /// Stable machine-readable code for API consumers
    pub fn code(&self) -> &'static str {
        match &self.kind {
            AppErrorKind::Validation { .. } => "VALIDATION_ERROR",
            AppErrorKind::Infrastructure(InfrastructureError::Configuration { .. }) => {
                "CONFIGURATION_ERROR"
            }
            AppErrorKind::Infrastructure(InfrastructureError::Serialization { .. }) => {
                "SERIALIZATION_ERROR"
            }
            AppErrorKind::Infrastructure(InfrastructureError::Internal { .. }) => {
                "INTERNAL_ERROR"
            }
            AppErrorKind::External(ExternalError::OrderStore { .. }) => "ORDER_STORE_ERROR",
            AppErrorKind::External(ExternalError::Timeout { .. }) => "UPSTREAM_TIMEOUT",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match &self.kind {
            AppErrorKind::Validation { message, .. } => message.clone(),
            AppErrorKind::Infrastructure(err) => err.to_string(),
            AppErrorKind::External(err) => err.to_string(),
        };

        if let Some(context) = &self.context {
            write!(f, "{} ({})", message, context)
        } else {
            write!(f, "{}", message)
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::serialization(format!("JSON error: {}", err))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let fields = match &self.kind {
            AppErrorKind::Validation { fields, .. } => fields.clone(),
            _ => Vec::new(),
        };
        // Internal details stay in the logs
        let message = if status.is_server_error() {
            "Payment request could not be processed".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.code(),
                message,
                fields,
            },
        };

        (status, Json(body)).into_response()
    }
}
