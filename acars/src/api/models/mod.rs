//! API request and response data models.
//!
//! - [`contact`]: contact form payload and response
//! - [`sell_car`]: car listing response summary

pub mod contact;
pub mod sell_car;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope returned for every failed request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable reason, safe to show to the visitor
    pub message: String,
}

/// Response of the root health check
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub message: String,
}
