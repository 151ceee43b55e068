//! # filedrop: drag-and-drop file uploads over GraphQL
//!
//! `filedrop` is a small upload server. Browsers drop files onto a page, the files travel to the
//! server as a GraphQL multipart request, land on local disk under a random public path, and are
//! listed back through a GraphQL query. The stored bytes are then served as static files.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! [async-graphql](https://github.com/async-graphql/async-graphql) for the API. Nothing is
//! persisted apart from the uploaded files themselves: the list of uploads lives in memory and
//! starts empty on every launch.
//!
//! ### Core Components
//!
//! The **storage layer** ([`storage`]) names uploads, writes their bytes through the
//! [`storage::FileStorage`] trait and keeps the in-memory [`storage::UploadRegistry`].
//!
//! The **GraphQL layer** ([`graphql`]) exposes the `uploads` query and the `uploadFiles` mutation
//! on `/graphql`.
//!
//! The **HTTP layer** ([`api`]) serves the client page on `/`, its scripts under `/assets`, and
//! previously uploaded files under the configured path prefix (`/uploads` by default).
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use filedrop::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = filedrop::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     filedrop::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
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
pub mod errors;
pub mod graphql;
mod static_assets;
pub mod storage;
pub mod telemetry;
pub mod ui;

#[cfg(test)]
pub mod test_utils;

use crate::api::handlers;
use crate::config::CorsOrigin;
use crate::graphql::UploadSchema;
use crate::storage::{LocalFileStorage, UploadNamespace, UploadRegistry, Uploads};
use crate::ui::Ui;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .uploads(uploads.clone())
///     .schema(graphql::build_schema(uploads))
///     .ui(Arc::new(ui))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub uploads: Uploads,
    pub schema: UploadSchema,
    pub ui: Arc<Ui>,
}

impl AppState {
    /// Wire storage, schema and page renderer together from `config`.
    ///
    /// Creates the upload directory if it does not exist yet.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let storage = LocalFileStorage::new(config.uploads.dir.clone());
        storage.init().await?;

        let uploads = Uploads::new(
            UploadNamespace::new(config.uploads.path_prefix.clone(), config.uploads.token_length),
            Arc::new(storage),
            UploadRegistry::new(),
        );
        let schema = graphql::build_schema(uploads.clone());
        let ui = Ui::new(config.client.clone(), handlers::graphql::GRAPHQL_PATH)?;

        Ok(Self::builder()
            .config(config)
            .uploads(uploads)
            .schema(schema)
            .ui(Arc::new(ui))
            .build())
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allowed = &config.cors.allowed_origins;
    let allow_origin = if allowed.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::with_capacity(allowed.len());
        for origin in allowed {
            if let CorsOrigin::Url(url) = origin {
                // browsers send origins without a trailing slash
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS, Method::DELETE])
        .allow_headers(AllowHeaders::any());

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// - `GET /healthz`: liveness
/// - `GET /`: client page, `GET /assets/{*path}`: its scripts and styles
/// - `POST /graphql`: GraphQL, including multipart uploads. `GET /graphql` serves GraphiQL when
///   `graphql.playground` is on and executes queries otherwise
/// - `GET {uploads.path_prefix}/{*path}`: stored upload bytes
///
/// CORS and request tracing wrap every route.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let graphql_routes = if state.config.graphql.playground {
        get(handlers::graphql::graphiql).post(handlers::graphql::graphql_handler)
    } else {
        get(handlers::graphql::graphql_handler).post(handlers::graphql::graphql_handler)
    };
    // uploads are not size-limited
    let graphql_routes = graphql_routes.layer(DefaultBodyLimit::disable());

    let uploads_route = format!("{}/{{*path}}", state.uploads.namespace().prefix());
    debug!(route = %uploads_route, "Serving uploads");

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/", get(handlers::ui::index))
        .route("/assets/{*path}", get(handlers::static_assets::serve_embedded_asset))
        .route(handlers::graphql::GRAPHQL_PATH, graphql_routes)
        .route(&uploads_route, get(handlers::uploads::serve_upload))
        .with_state(state.clone());

    let router = router.layer(create_cors_layer(&state.config)?);

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and configuration.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] creates the upload directory and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests finish and telemetry is
///    flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting filedrop with configuration: {:#?}", config);

        let state = AppState::from_config(config.clone()).await?;
        let router = build_router(&state)?;

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
            "filedrop listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );
        info!(dir = %self.config.uploads.dir.display(), prefix = %self.config.uploads.path_prefix, "Serving uploads");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
