use analytics::AnalyticsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dashboard::LoadError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("Dashboard load error: {0}")]
    Load(#[from] LoadError),
    #[error("Not found: {0}")]
    NotFound(String),
}

fn analytics_status(err: &AnalyticsError) -> StatusCode {
    match err {
        AnalyticsError::MalformedRecord { .. } | AnalyticsError::InvalidObservation { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalyticsError::Calculation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Analytics(err) | AppError::Load(LoadError::Analytics(err)) => {
                let status = analytics_status(err);
                if status.is_server_error() {
                    tracing::error!(error = ?err, "Analytics error.");
                }
                (status, err.to_string())
            }
            AppError::Load(err @ LoadError::FetchFailure(_)) => {
                tracing::error!(error = ?err, "Sales source error.");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            AppError::Load(err @ LoadError::Superseded { .. }) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
