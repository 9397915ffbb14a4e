//! # PriceLens Dashboard
//!
//! Load orchestration for the pricing dashboard. A `DashboardLoader` pulls raw
//! sales from a `SalesSource`, runs the analytics, and publishes an immutable
//! `DashboardSnapshot` together with a `DashboardEvent` for every observer.
//!
//! The `presentation` module holds the threshold bands the views colour by.

pub mod error;
pub mod loader;
pub mod presentation;
pub mod source;

pub use error::{LoadError, SourceError};
pub use loader::{Analysis, DashboardLoader};
pub use presentation::{Bands, ConfidenceBand, PriorityBand, Trend};
pub use source::{JsonFileSource, SalesSource, StaticSource};
