//! # clauseguard-relay: upload relay for the ClauseGuard analysis service
//!
//! A thin HTTP relay sitting between ClauseGuard clients and the contract
//! analysis service. Clients POST a contract as a multipart upload; the relay
//! spools it to a temp file, forwards it to the configured upstream analysis
//! endpoint, and hands the resulting JSON document back inside a success
//! envelope carrying the original filename. The temp file is deleted on every
//! exit path.
//!
//! ## Request Flow
//!
//! `POST /analyze` (multipart field `contract`) →
//! [`spool::SpooledFile`] (temp file under `upload_dir`) →
//! [`upstream::AnalysisClient`] (multipart POST to the analysis endpoint,
//! bounded timeout, optional transient-failure retry) →
//! success envelope, or a structured error body. Requests are fully
//! independent: no shared mutable state, one temp file and one upstream round
//! trip per request.
//!
//! The analysis logic itself lives behind the upstream endpoint; this crate
//! never inspects the document it relays.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use clauseguard_relay::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = clauseguard_relay::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     clauseguard_relay::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for the YAML/environment configuration surface.

pub mod api;
pub mod config;
pub mod errors;
mod openapi;
mod spool;
pub mod telemetry;
pub mod upstream;

#[cfg(test)]
mod test;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi as _;
use utoipa_scalar::{Scalar, Servable as _};

pub use config::Config;
use upstream::AnalysisClient;

/// Shared state for request handlers.
///
/// Holds no cross-request mutable state: handlers only read configuration and
/// share the HTTP client's connection pool.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub analyzer: AnalysisClient,
}

/// Build the HTTP router for the relay.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route(
            "/analyze",
            post(api::handlers::analyze::analyze_contract).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state)
        .merge(Scalar::with_url("/docs", openapi::ApiDoc::openapi()))
        // The dashboard frontend is served from a different origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// The relay application: a ready-to-serve router plus its configuration.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .with_context(|| format!("creating upload directory {}", config.upload_dir.display()))?;

        let analyzer = AnalysisClient::new(config.upstream.clone())?;

        let state = AppState {
            config: config.clone(),
            analyzer,
        };
        let router = build_router(state);

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Relay listening on http://{}, forwarding uploads to {}",
            bind_addr, self.config.upstream.url
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
