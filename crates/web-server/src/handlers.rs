use crate::{error::AppError, AppState};
use analytics::{
    overall_accuracy, ElasticityEstimate, MonthlyElasticity, PriceOptimization, SalesForecast,
    Segmentation,
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Json,
};
use core_types::{
    DashboardMetrics, ElasticityRecord, PromotionSummary, Recommendation, SalesObservation,
};
use events::DashboardSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Deserialize)]
pub struct DeriveRequest {
    pub records: Vec<ElasticityRecord>,
    #[serde(default)]
    pub promotions: Vec<PromotionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeriveResponse {
    pub metrics: DashboardMetrics,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
pub struct SalesRequest {
    pub sales: Vec<SalesObservation>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticityResponse {
    pub estimates: Vec<ElasticityEstimate>,
    pub segmentation: Segmentation,
    pub monthly: Vec<MonthlyElasticity>,
    pub optimization: PriceOptimization,
    pub forecasts: Vec<SalesForecast>,
    /// Mean accuracy of the forecasts, absent when no category had enough history.
    pub forecast_accuracy: Option<f64>,
}

/// # POST /api/dashboard/derive
/// Metrics and recommendations for precomputed elasticity records.
pub async fn derive_dashboard(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeriveRequest>,
) -> Result<Json<DeriveResponse>, AppError> {
    let (metrics, recommendations) = state
        .engine
        .derive_dashboard(&request.records, &request.promotions)?;
    Ok(Json(DeriveResponse {
        metrics,
        recommendations,
    }))
}

/// # POST /api/elasticity
/// Per-category elasticity estimates, their segmentation, the monthly view, the
/// optimization totals and the sales forecasts for a batch of sales.
pub async fn estimate_elasticity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SalesRequest>,
) -> Result<Json<ElasticityResponse>, AppError> {
    let analysis = state.loader.analyze(&request.sales)?;
    Ok(Json(ElasticityResponse {
        forecast_accuracy: overall_accuracy(&analysis.forecasts),
        estimates: analysis.estimates,
        segmentation: analysis.segmentation,
        monthly: analysis.monthly,
        optimization: analysis.optimization,
        forecasts: analysis.forecasts,
    }))
}

/// # GET /api/dashboard
/// The most recently published dashboard snapshot.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Arc<DashboardSnapshot>>, AppError> {
    state
        .loader
        .latest()
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No dashboard has been loaded yet".to_string()))
}

/// # POST /api/dashboard/refresh
/// Reloads the sales source and publishes a new snapshot.
pub async fn refresh_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Arc<DashboardSnapshot>>, AppError> {
    let snapshot = state.loader.load().await?;
    Ok(Json(snapshot))
}

/// # GET /ws
/// Streams every `DashboardEvent` to the client as JSON text frames.
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    tracing::info!("[WS] New client connected.");
    let mut events = state.loader.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "[WS] Client lagging; events dropped.");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "[WS] Failed to serialize event.");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("[WS] Client disconnected.");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "[WS] Error.");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    tracing::info!("[WS] Connection closed.");
}
