use crate::elasticity::{check_observation, mean};
use crate::error::AnalyticsError;
use core_types::{PromotionSummary, SalesObservation};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Per-category quantity and revenue of observations without a promotion.
struct Baseline {
    quantity: f64,
    revenue: f64,
}

/// Measures promotion uplift against each category's unpromoted baseline.
#[derive(Debug, Clone, Default)]
pub struct PromotionAnalyzer {}

impl PromotionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarises every promotion named in `observations`, ordered by name.
    ///
    /// Promoted observations of a category that was never sold without a promotion
    /// have nothing to compare against and are skipped.
    pub fn analyze(
        &self,
        observations: &[SalesObservation],
    ) -> Result<Vec<PromotionSummary>, AnalyticsError> {
        for obs in observations {
            check_observation(obs)?;
        }

        let baselines = baselines(observations);

        let mut promoted: BTreeMap<&str, Vec<&SalesObservation>> = BTreeMap::new();
        for obs in observations {
            if let Some(name) = obs.promotion.as_deref() {
                promoted.entry(name).or_default().push(obs);
            }
        }

        let mut summaries = Vec::with_capacity(promoted.len());
        for (name, group) in promoted {
            let mut sales_uplift = Vec::new();
            let mut check_uplift = Vec::new();
            for obs in &group {
                let Some(baseline) = baselines.get(obs.category.as_str()) else {
                    continue;
                };
                sales_uplift.push((obs.quantity / baseline.quantity - 1.0) * 100.0);
                check_uplift.push((obs.revenue() / baseline.revenue - 1.0) * 100.0);
            }
            if sales_uplift.is_empty() {
                tracing::warn!(promotion = name, "Promotion has no unpromoted baseline; skipping.");
                continue;
            }

            let (sold, visits) = group
                .iter()
                .filter_map(|o| o.visits.map(|v| (o.quantity, v)))
                .fold((0.0, 0.0), |(q, v), (oq, ov)| (q + oq, v + ov));
            let conversion_rate = if visits > 0.0 {
                Some(percent(name, sold / visits * 100.0)?)
            } else {
                None
            };

            summaries.push(PromotionSummary {
                name: name.to_string(),
                sales_increase: percent(name, mean(&sales_uplift))?,
                average_check: percent(name, mean(&check_uplift))?,
                conversion_rate,
            });
        }

        tracing::debug!(promotions = summaries.len(), "Analyzed promotions.");
        Ok(summaries)
    }
}

fn baselines(observations: &[SalesObservation]) -> HashMap<&str, Baseline> {
    let mut grouped: HashMap<&str, (Vec<f64>, Vec<f64>)> = HashMap::new();
    for obs in observations.iter().filter(|o| o.promotion.is_none()) {
        let entry = grouped.entry(obs.category.as_str()).or_default();
        entry.0.push(obs.quantity);
        entry.1.push(obs.revenue());
    }
    grouped
        .into_iter()
        .map(|(category, (quantities, revenues))| {
            (
                category,
                Baseline {
                    quantity: mean(&quantities),
                    revenue: mean(&revenues),
                },
            )
        })
        .collect()
}

fn percent(promotion: &str, value: f64) -> Result<Decimal, AnalyticsError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| {
            AnalyticsError::Calculation(format!(
                "promotion '{}' produced a non-representable percentage {}",
                promotion, value
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    #[test]
    fn uplift_is_measured_against_unpromoted_sales() {
        let observations = vec![
            SalesObservation::new("Juice", day(1), 2.0, 100.0),
            SalesObservation::new("Juice", day(2), 2.0, 100.0),
            SalesObservation::new("Juice", day(3), 1.5, 150.0).with_promotion("Spring"),
        ];
        let summaries = PromotionAnalyzer::new().analyze(&observations).unwrap();
        assert_eq!(summaries.len(), 1);
        let spring = &summaries[0];
        assert_eq!(spring.name, "Spring");
        assert_eq!(spring.sales_increase, dec!(50));
        // Revenue 225 against a baseline of 200.
        assert_eq!(spring.average_check, dec!(12.5));
        assert_eq!(spring.conversion_rate, None);
    }

    #[test]
    fn conversion_rate_uses_visits_when_present() {
        let observations = vec![
            SalesObservation::new("Juice", day(1), 2.0, 100.0),
            SalesObservation::new("Juice", day(2), 2.0, 120.0)
                .with_promotion("Flash")
                .with_visits(480.0),
        ];
        let summaries = PromotionAnalyzer::new().analyze(&observations).unwrap();
        assert_eq!(summaries[0].conversion_rate, Some(dec!(25)));
    }

    #[test]
    fn promotion_without_baseline_is_skipped() {
        let observations = vec![
            SalesObservation::new("Snacks", day(1), 1.0, 10.0).with_promotion("Launch"),
        ];
        let summaries = PromotionAnalyzer::new().analyze(&observations).unwrap();
        assert!(summaries.is_empty());
    }
}
