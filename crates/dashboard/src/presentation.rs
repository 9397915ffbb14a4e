use configuration::PresentationConfig;
use rust_decimal::Decimal;
use serde::Serialize;

/// Colour band of a recommendation's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

/// Colour band of a recommendation's priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriorityBand {
    Urgent,
    Elevated,
    Routine,
}

/// Direction arrow next to a metric card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn of(change: Decimal) -> Self {
        if change >= Decimal::ZERO { Trend::Up } else { Trend::Down }
    }
}

/// Maps raw scores onto the bands the views colour by. Lower bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct Bands {
    config: PresentationConfig,
}

impl Bands {
    pub fn new(config: PresentationConfig) -> Self {
        Self { config }
    }

    pub fn confidence(&self, confidence: Decimal) -> ConfidenceBand {
        if confidence >= self.config.confidence_high {
            ConfidenceBand::High
        } else if confidence >= self.config.confidence_medium {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn priority(&self, priority: Decimal) -> PriorityBand {
        if priority >= self.config.priority_urgent {
            PriorityBand::Urgent
        } else if priority >= self.config.priority_elevated {
            PriorityBand::Elevated
        } else {
            PriorityBand::Routine
        }
    }
}
