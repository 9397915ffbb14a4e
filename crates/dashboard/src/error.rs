use analytics::AnalyticsError;
use thiserror::Error;

/// Failures of a `SalesSource`.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read sales data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse sales data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Sales source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Fetching sales data failed: {0}")]
    FetchFailure(#[from] SourceError),

    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    #[error("Load {generation} was superseded by load {latest}")]
    Superseded { generation: u64, latest: u64 },
}
