//! # PriceLens Core Types
//!
//! The shared data model: elasticity records coming out of the pricing model, raw
//! sales observations, and the dashboard structures derived from them. This crate
//! has no knowledge of how any of these are computed.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::ElasticityClass;
pub use error::CoreError;
pub use structs::{
    DashboardMetrics, ElasticityRecord, PotentialProfit, PromotionSummary, Recommendation,
    SalesObservation,
};
