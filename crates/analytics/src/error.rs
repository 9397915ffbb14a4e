use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Malformed elasticity record #{index} ('{category}'): {source}")]
    MalformedRecord {
        index: usize,
        category: String,
        #[source]
        source: CoreError,
    },

    #[error("Invalid sales observation for '{category}': {reason}")]
    InvalidObservation { category: String, reason: String },

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
