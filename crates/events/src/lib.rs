//! # PriceLens Events
//!
//! This crate defines the notifications a dashboard load publishes to its observers,
//! replacing the implicit re-render of the web front end with explicit events.
//!
//! As a Layer 0 crate, it depends only on `core-types`.

// Declare the modules that make up this crate.
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use messages::{DashboardEvent, DashboardSnapshot};
