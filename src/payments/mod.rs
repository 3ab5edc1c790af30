//! Payment provider integration module
//!
//! Signing, paywall initiation and notification handling for the Payzone integration.

pub mod callback;
pub mod providers;
pub mod signature;
pub mod traits;
pub mod types;
