//! HTTP request handlers.
//!
//! Each form handler runs the same chain: decode the body, validate, store media (sell-car
//! only), relay by email, respond. Failures are returned as [`crate::errors::Error`] values and
//! rendered as `{success: false, message}` envelopes.
//!
//! - [`health`]: root status message and the JSON 404 fallback
//! - [`contact`]: contact form relay
//! - [`sell_car`]: car listing form with media uploads

pub mod contact;
pub mod health;
pub mod sell_car;
