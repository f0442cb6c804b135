use anyhow::Result;
use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Config, handlers, handlers::quote::AppState, metrics, provider::CatalogStore,
    signals::setup_signal_handlers,
};

/// Start the pricing server
///
/// This function:
/// 1. Initializes metrics
/// 2. Loads the price book into an atomically swappable snapshot
/// 3. Sets up signal handlers for graceful shutdown and reload
/// 4. Creates the Axum application
/// 5. Serves requests with graceful shutdown support
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics());

    // Wrap config in ArcSwap for atomic reload support
    let config_swap = Arc::new(ArcSwap::from_pointee(config.clone()));

    // Load the price book; readers see one consistent snapshot
    let catalog = Arc::new(CatalogStore::load(PathBuf::from(&config.catalog.path))?);

    // Setup signal handlers (SIGTERM, SIGINT for shutdown; SIGHUP for reload)
    let (shutdown_tx, signal_handle) = setup_signal_handlers(config_swap.clone(), catalog.clone());
    let mut shutdown_rx = shutdown_tx.subscribe();

    let app_state = AppState {
        config: config_swap.clone(),
        catalog: catalog.clone(),
    };

    // Build the Axum router
    let app = create_router(app_state, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting pricing server on {}", addr);
    info!(
        "Configuration: {} products, minimum subscription {}, global markup {}%",
        catalog.current().products.len(),
        config.pricing.minimum_subscription,
        config.pricing.global_markup_percent
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
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
    app_state: AppState,
    metrics_handle: Arc<metrics_exporter_prometheus::PrometheusHandle>,
) -> Router {
    let api_routes = Router::new()
        .route("/v1/quote", post(handlers::quote::handle_quote))
        .route("/v1/reconcile", post(handlers::reconcile::handle_reconcile))
        .route("/v1/catalog", get(handlers::catalog::list_catalog))
        .route("/v1/catalog/:product", get(handlers::catalog::get_product))
        .route("/v1/reload", post(handlers::catalog::reload_catalog))
        .route("/ready", get(handlers::health::readiness_check))
        .with_state(app_state);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics_handler::metrics))
        .with_state(metrics_handle)
        .merge(api_routes)
        // Limit request body size to 1MB; quote payloads are small
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
}
