use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    auth,
    config::Config,
    handlers::{self, AppState},
    history::HistoryStore,
    metrics,
    signals::setup_signal_handlers,
};

/// Start the cost advisor server
///
/// This function:
/// 1. Initializes metrics and analysis history (when enabled)
/// 2. Sets up signal handlers for graceful shutdown and config reload
/// 3. Creates the Axum application
/// 4. Binds to the configured address
/// 5. Serves requests with graceful shutdown support
pub async fn start_server(config: Config, config_path: PathBuf) -> Result<()> {
    let metrics_handle = if config.metrics.enabled {
        info!("Initializing Prometheus metrics...");
        Some(Arc::new(metrics::init_metrics()?))
    } else {
        None
    };

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    let body_limit = config.upload.max_file_bytes;
    let key_count = config.api_keys.len();

    let history = if config.history.enabled {
        info!("Opening analysis history at {}", config.history.database_url);
        Some(Arc::new(HistoryStore::connect(&config.history.database_url).await?))
    } else {
        None
    };

    let mut state = AppState::new(config);
    if let Some(history) = history {
        state = state.with_history(history);
    }

    // SIGTERM, SIGINT for shutdown; SIGHUP for reload
    let (shutdown_tx, signal_handle) = setup_signal_handlers(state.clone(), config_path)?;
    let mut shutdown_rx = shutdown_tx.subscribe();

    let app = create_router(state, metrics_handle, body_limit);

    info!("Starting AWS Cost Advisor on {}", addr);
    info!(
        "Configuration: {} API keys, upload limit {} bytes",
        key_count, body_limit
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(
    state: AppState,
    metrics_handle: Option<Arc<PrometheusHandle>>,
    body_limit: usize,
) -> Router {
    let cors = cors_layer(&state.config.load().server.cors_origins);

    let mut auth_routes = Router::new()
        .route("/api/analyze", post(handlers::analyze::analyze_costs))
        .route("/api/upload-billing", post(handlers::upload::upload_billing));

    if let Some(history) = state.history.clone() {
        auth_routes = auth_routes.merge(
            Router::new()
                .route("/api/analyses", get(handlers::history::list_analyses))
                .with_state(history),
        );
    }

    // route_layer: unmatched paths fall through to 404 instead of 401
    let auth_routes = auth_routes
        .route_layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth::auth_middleware,
        ))
        .with_state(state);

    let mut public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/api/subscription/plans", get(handlers::plans::list_plans));

    if let Some(handle) = metrics_handle {
        public_routes = public_routes.merge(
            Router::new()
                .route("/metrics", get(handlers::metrics_handler::metrics))
                .with_state(handle),
        );
    }

    let mut app = public_routes
        .merge(auth_routes)
        .layer(DefaultBodyLimit::max(body_limit));
    if let Some(cors) = cors {
        app = app.layer(cors);
    }
    app.layer(TraceLayer::new_for_http())
}

/// CORS for the configured browser origins; `None` when the list is empty
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
