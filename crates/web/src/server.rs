//! Web server implementation

use crate::config::WebConfig;
use crate::extraction::{extraction_routes, HttpExtractor, PageExtractor};
use crate::registry::{experiment_routes, ExperimentRegistry};
use crate::static_files::StaticFiles;
use crate::tracking::{tracking_routes, HttpTracker, LogTracker, TrackingService};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use splitview_common::control::PRESET_COLORS;
use splitview_common::random_color;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Web server state
#[derive(Clone)]
pub struct WebServer {
    state: Arc<WebServerState>,
    cors_permissive: bool,
}

struct WebServerState {
    registry: Arc<ExperimentRegistry>,
    tracker: Arc<dyn TrackingService>,
    extractor: Option<Arc<dyn PageExtractor>>,
    static_files: StaticFiles,
}

pub async fn serve(addr: SocketAddr, cfg: WebConfig) -> anyhow::Result<()> {
    let server = WebServer::from_config(&cfg)?;
    server.serve(addr).await
}

impl WebServer {
    /// Create a server from explicit parts.
    pub fn new(
        registry: ExperimentRegistry,
        tracker: Arc<dyn TrackingService>,
        extractor: Option<Arc<dyn PageExtractor>>,
    ) -> Self {
        Self {
            state: Arc::new(WebServerState {
                registry: Arc::new(registry),
                tracker,
                extractor,
                static_files: StaticFiles::new(),
            }),
            cors_permissive: true,
        }
    }

    /// Build the registry and collaborators described by `cfg`.
    pub fn from_config(cfg: &WebConfig) -> anyhow::Result<Self> {
        let registry = match &cfg.experiments_file {
            Some(path) => ExperimentRegistry::load(path)?,
            None => {
                info!("No experiments file configured, serving built-in experiments");
                ExperimentRegistry::builtin()
            }
        };

        let tracker: Arc<dyn TrackingService> = match &cfg.tracking.collector_url {
            Some(url) => {
                info!("Forwarding tracking events to {}", url);
                Arc::new(HttpTracker::new(
                    url,
                    Duration::from_secs(cfg.tracking.timeout_secs),
                )?)
            }
            None => {
                warn!("No tracking collector configured, events will only be logged");
                Arc::new(LogTracker)
            }
        };

        let extractor: Option<Arc<dyn PageExtractor>> = match &cfg.extraction.service_url {
            Some(url) => Some(Arc::new(HttpExtractor::new(
                url,
                Duration::from_secs(cfg.extraction.timeout_secs),
            )?)),
            None => None,
        };

        Ok(Self::new(registry, tracker, extractor).with_permissive_cors(cfg.cors_permissive))
    }

    /// Allow any origin, method and header. On by default.
    pub fn with_permissive_cors(mut self, enabled: bool) -> Self {
        self.cors_permissive = enabled;
        self
    }

    pub fn registry(&self) -> &ExperimentRegistry {
        &self.state.registry
    }

    /// Create router
    pub fn router(&self) -> Router {
        let state = self.state.clone();

        let router = Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/colors/random", get(random_color_handler))
            .route("/api/colors/presets", get(preset_colors_handler))
            .route("/tracking-script.js", get(tracking_script_handler))
            .with_state(state.clone())
            .merge(experiment_routes(state.registry.clone()))
            .merge(tracking_routes(state.tracker.clone()))
            .merge(extraction_routes(state.extractor.clone()))
            .fallback(not_found_handler);

        let router = if self.cors_permissive {
            router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        } else {
            router
        };

        router.layer(TraceLayer::new_for_http())
    }

    /// Start the web server; returns after ctrl-c once in-flight requests
    /// finish.
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!(
            "Splitview web starting on http://{} ({} experiment(s))",
            addr,
            self.state.registry.len()
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Splitview web stopped");
        Ok(())
    }
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new(ExperimentRegistry::builtin(), Arc::new(LogTracker), None)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "splitview-web"
    }))
}

async fn random_color_handler() -> impl IntoResponse {
    let color = random_color(&mut rand::thread_rng());
    Json(serde_json::json!({ "color": color }))
}

async fn preset_colors_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "colors": PRESET_COLORS }))
}

async fn tracking_script_handler(State(state): State<Arc<WebServerState>>) -> Response {
    state.static_files.serve("tracking-script.js")
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
