use crate::error::SourceError;
use async_trait::async_trait;
use core_types::SalesObservation;
use std::path::PathBuf;

/// The generic, abstract interface for wherever raw sales come from.
/// The loader only ever talks to this trait, so a file, an in-memory fixture or a
/// remote spreadsheet can be swapped in without touching the analytics.
#[async_trait]
pub trait SalesSource: Send + Sync {
    async fn fetch_sales(&self) -> Result<Vec<SalesObservation>, SourceError>;
}

/// Reads a JSON array of sales observations from disk on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SalesSource for JsonFileSource {
    async fn fetch_sales(&self) -> Result<Vec<SalesObservation>, SourceError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let observations: Vec<SalesObservation> = serde_json::from_str(&contents)?;
        tracing::debug!(
            path = %self.path.display(),
            observations = observations.len(),
            "Read sales file."
        );
        Ok(observations)
    }
}

/// Serves a fixed set of observations, e.g. a request body.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    observations: Vec<SalesObservation>,
}

impl StaticSource {
    pub fn new(observations: Vec<SalesObservation>) -> Self {
        Self { observations }
    }
}

#[async_trait]
impl SalesSource for StaticSource {
    async fn fetch_sales(&self) -> Result<Vec<SalesObservation>, SourceError> {
        Ok(self.observations.clone())
    }
}
