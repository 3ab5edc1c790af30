//! Payment provider implementations
//!
//! Concrete implementations of the PaymentProvider trait.

pub mod payzone;

pub use payzone::PayzoneProvider;
