//! Payment gateway bridging the Kaari marketplace to the Payzone hosted paywall.
//!
//! Outbound, it signs paywall payloads and hands the customer's browser an auto-submitting
//! form. Inbound, it verifies provider notifications and reports confirmed payments to the
//! order store.

pub mod api;
pub mod config;
pub mod error;
pub mod orders;
pub mod payments;

pub use api::{router, AppState};
pub use config::Config;
pub use error::{AppError, AppResult};
