//! # PriceLens Analytics
//!
//! This crate turns sales data into the numbers shown on the pricing dashboard.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of where sales
//!   data comes from or how results are displayed. It depends only on `core-types` and
//!   `configuration` (Layer 0).
//! - **Stateless Calculation:** Every engine here is a stateless calculator. Inputs go
//!   in, a freshly built result comes out, which makes them easy to test.
//!
//! ## Public API
//!
//! - `MetricsEngine`: dashboard metrics and the ranked recommendation list.
//! - `ElasticityEstimator`: per-category elasticity and optimum price from raw sales.
//! - `PromotionAnalyzer`: sales and average-check uplift per promotion.
//! - `SalesForecaster`: random-forest forecast of daily quantity under three price scenarios.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod elasticity;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod promotions;

// Re-export the key components to create a clean, public-facing API.
pub use elasticity::{
    records_of, ElasticityEstimate, ElasticityEstimator, MonthlyElasticity, PriceOptimization,
    Segmentation,
};
pub use engine::MetricsEngine;
pub use error::AnalyticsError;
pub use forecast::{
    overall_accuracy, ForecastPoint, ForecastSummary, SalesForecast, SalesForecaster, SalesTrend,
    ScenarioForecast,
};
pub use promotions::PromotionAnalyzer;
