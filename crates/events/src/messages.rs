use chrono::{DateTime, Utc};
use core_types::{DashboardMetrics, ElasticityRecord, PromotionSummary, Recommendation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything the dashboard page renders after one completed load.
///
/// A snapshot is immutable once published; the next load replaces it as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// The load that produced this snapshot. Strictly increasing across loads.
    pub generation: u64,
    pub generated_at: DateTime<Utc>,
    pub elasticity_data: Vec<ElasticityRecord>,
    pub promotions_data: Vec<PromotionSummary>,
    pub recommendations: Vec<Recommendation>,
    pub metrics: DashboardMetrics,
}

/// The top-level dashboard notification enum.
/// Every state change of the dashboard is announced as one of these variants.
///
/// Serialized with `#[serde(tag = "type", content = "payload")]`, so a failure looks like:
/// `{
///   "type": "LoadFailed",
///   "payload": { "generation": 4, "message": "..." }
/// }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DashboardEvent {
    /// A load was started; the view may show its loading state.
    LoadStarted { generation: u64 },
    /// A load completed and replaced the published snapshot.
    DashboardUpdated(Arc<DashboardSnapshot>),
    /// A load failed. The view must show its error state rather than the previous snapshot.
    LoadFailed { generation: u64, message: String },
    /// A load finished after a newer one and its result was dropped.
    LoadSuperseded { generation: u64, latest: u64 },
}

impl DashboardEvent {
    /// The load this event belongs to.
    pub fn generation(&self) -> u64 {
        match self {
            DashboardEvent::LoadStarted { generation }
            | DashboardEvent::LoadFailed { generation, .. }
            | DashboardEvent::LoadSuperseded { generation, .. } => *generation,
            DashboardEvent::DashboardUpdated(snapshot) => snapshot.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DashboardMetrics;

    fn snapshot(generation: u64) -> DashboardSnapshot {
        DashboardSnapshot {
            generation,
            generated_at: Utc::now(),
            elasticity_data: vec![ElasticityRecord::new("Tea", -0.4, 200.0, 210.0, 5.0)],
            promotions_data: vec![],
            recommendations: vec![],
            metrics: DashboardMetrics::empty(0),
        }
    }

    #[test]
    fn events_are_adjacently_tagged() {
        let event = DashboardEvent::LoadFailed {
            generation: 4,
            message: "source unavailable".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "LoadFailed");
        assert_eq!(json["payload"]["generation"], 4);
    }

    #[test]
    fn snapshot_payload_uses_front_end_field_names() {
        let event = DashboardEvent::DashboardUpdated(Arc::new(snapshot(7)));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DashboardUpdated");
        assert_eq!(json["payload"]["generation"], 7);
        assert_eq!(json["payload"]["elasticityData"][0]["category"], "Tea");
        assert!(json["payload"]["metrics"].get("avgElasticity").is_some());
        assert_eq!(event.generation(), 7);
    }
}
