//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for the form and health endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Health** (`/`, `/healthz`): liveness checks
//! - **Contact** (`/api/contact`): general contact form relay
//! - **Sell car** (`/api/sell-car`): car listing form with media uploads
//! - **Uploads** (`/uploads/*`): read-only view of stored media
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
