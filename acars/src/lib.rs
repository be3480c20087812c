//! # acars: backend for the A Cars website
//!
//! `acars` serves the two forms of the A Cars website and relays every submission by email.
//!
//! ## Request Flow
//!
//! - **Contact** (`POST /api/contact`): the JSON or urlencoded body is validated, then the
//!   [`email::Notifier`] sends a notification to the business mailbox followed by a
//!   confirmation to the visitor.
//! - **Sell car** (`POST /api/sell-car`): the multipart body is streamed by [`upload`], which
//!   enforces file type, size and count limits while staging files in memory. Text fields are
//!   validated next; only then are the files written to the uploads directory and attached to
//!   the notification email.
//!
//! Every failure is a tagged [`errors::Error`] rendered as `{success: false, message}` with a
//! status code chosen by its [`errors::ErrorKind`].
//!
//! There is no database: submissions live only as long as the request, and uploaded files
//! stay in the uploads directory (served read-only under `/uploads`).
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use acars::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = acars::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     acars::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod email;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;
pub mod upload;
pub mod validation;

#[cfg(test)]
pub mod test_utils;

use axum::extract::DefaultBodyLimit;
use axum::handler::HandlerWithoutStateExt;
use axum::http::{self, HeaderValue, Method};
use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use email::Notifier;
use openapi::ApiDoc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use upload::UploadStore;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// Built once at startup; nothing in it changes while the server runs.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub notifier: Arc<Notifier>,
    pub uploads: UploadStore,
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    let allow_origin = if cors_config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::with_capacity(cors_config.allowed_origins.len());
        for origin in &cors_config.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let body_limit = state.config.limits.multipart_body_limit();

    let router = Router::new()
        .route("/", get(api::handlers::health::index))
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/contact", post(api::handlers::contact::submit_contact))
        .route(
            "/api/sell-car",
            post(api::handlers::sell_car::submit_car_listing).layer(DefaultBodyLimit::max(body_limit)),
        )
        .nest_service(
            "/uploads",
            ServeDir::new(state.uploads.dir())
                .fallback(api::handlers::health::not_found.into_service())
                .call_fallback_on_method_not_allowed(true),
        )
        .fallback(api::handlers::health::not_found)
        .method_not_allowed_fallback(api::handlers::health::not_found)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct.
///
/// 1. **Create**: [`Application::new`] creates the uploads directory, builds the mail
///    transport and the router
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let uploads = UploadStore::new(&config.uploads_dir);
        uploads.ensure_dir().await?;

        let notifier = Notifier::new(&config)?;

        let app_state = AppState::builder()
            .config(config.clone())
            .notifier(Arc::new(notifier))
            .uploads(uploads)
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "A Cars Backend Server listening on http://{}, health check at http://localhost:{}/",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
