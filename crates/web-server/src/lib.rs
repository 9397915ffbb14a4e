use analytics::MetricsEngine;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::Config;
use dashboard::{DashboardLoader, SalesSource};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};
// Note: Tracing is initialized by the binary that calls `run_server`.

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub engine: MetricsEngine,
    pub loader: DashboardLoader,
}

impl AppState {
    pub fn new(config: &Config, source: Arc<dyn SalesSource>) -> Self {
        Self {
            engine: MetricsEngine::new(config.derivation.clone()),
            loader: DashboardLoader::new(source, config),
        }
    }
}

/// Builds the application router with all routes and middleware.
pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/dashboard/refresh", post(handlers::refresh_dashboard))
        .route("/api/dashboard/derive", post(handlers::derive_dashboard))
        .route("/api/elasticity", post(handlers::estimate_elasticity))
        .route("/ws", get(handlers::websocket_handler))
        .with_state(app_state)
        .layer(cors)
        // Logs every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024 * 50)) // Sales uploads can be large.
}

/// Configures and runs the web server until it is shut down.
///
/// The first dashboard load runs before the listener is bound; a failure there is
/// logged and the server still starts, serving 404 on `/api/dashboard` until a
/// refresh succeeds.
pub async fn run_server(config: &Config, source: Arc<dyn SalesSource>) -> anyhow::Result<()> {
    let addr: SocketAddr = config.server.addr;
    let app_state = Arc::new(AppState::new(config, source));

    if let Err(e) = app_state.loader.load().await {
        tracing::warn!(error = %e, "Initial dashboard load failed.");
    }

    let app = router(app_state);

    tracing::info!("Web server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
