use crate::error::AnalyticsError;
use configuration::DerivationConfig;
use core_types::{
    CoreError, DashboardMetrics, ElasticityRecord, PotentialProfit, PromotionSummary,
    Recommendation,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Midpoints are rounded away from zero everywhere in the dashboard.
const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// An elasticity record whose numbers passed validation and were moved into decimal space.
#[derive(Debug, Clone)]
struct CheckedRecord<'a> {
    index: usize,
    category: &'a str,
    elasticity: Decimal,
    current_price: Decimal,
    optimum_price: Decimal,
    recommended_change: Decimal,
}

impl CheckedRecord<'_> {
    /// The price change in money terms: `recommended_change% * current_price`.
    fn money_change(&self) -> Result<Decimal, AnalyticsError> {
        self.recommended_change
            .checked_mul(self.current_price)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| self.overflow("potentialProfit"))
    }

    fn confidence(&self, config: &DerivationConfig) -> Result<Decimal, AnalyticsError> {
        let raw = self
            .elasticity
            .abs()
            .checked_mul(config.confidence_scale)
            .ok_or_else(|| self.overflow("confidence"))?;
        Ok(raw.min(config.confidence_cap).max(Decimal::ZERO))
    }

    fn priority(&self) -> Result<Decimal, AnalyticsError> {
        self.recommended_change
            .checked_mul(self.elasticity)
            .map(|v| v.abs())
            .ok_or_else(|| self.overflow("priority"))
    }

    fn overflow(&self, field: &str) -> AnalyticsError {
        AnalyticsError::MalformedRecord {
            index: self.index,
            category: self.category.to_string(),
            source: CoreError::InvalidInput(
                field.to_string(),
                "overflows the decimal range".to_string(),
            ),
        }
    }
}

/// Adds `value` to a running total, failing instead of overflowing.
fn accumulate(total: &mut Decimal, value: Decimal, what: &str) -> Result<(), AnalyticsError> {
    *total = total.checked_add(value).ok_or_else(|| {
        AnalyticsError::Calculation(format!("{what} overflows the decimal range"))
    })?;
    Ok(())
}

/// A stateless calculator for the dashboard metrics and the recommendation list.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: DerivationConfig,
}

impl MetricsEngine {
    pub fn new(config: DerivationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DerivationConfig {
        &self.config
    }

    /// Computes the four headline metrics.
    ///
    /// # Arguments
    ///
    /// * `records` - One elasticity record per product category. May be empty.
    /// * `promotions` - The promotion summaries of the same load; only counted.
    ///
    /// # Returns
    ///
    /// Zero-valued metrics when `records` is empty, otherwise the aggregates. Fails with
    /// `AnalyticsError::MalformedRecord` if any record carries a non-finite number or one
    /// whose products leave the decimal range, and with `AnalyticsError::Calculation` if
    /// a running total does.
    pub fn derive_metrics(
        &self,
        records: &[ElasticityRecord],
        promotions: &[PromotionSummary],
    ) -> Result<DashboardMetrics, AnalyticsError> {
        let checked = check_records(records)?;
        self.metrics_from(&checked, promotions.len())
    }

    /// Builds the ranked list of actionable price changes.
    ///
    /// Only changes strictly larger than the materiality threshold survive. The list is
    /// sorted by descending priority (ties keep their input order) and capped at
    /// `max_recommendations` entries.
    pub fn derive_recommendations(
        &self,
        records: &[ElasticityRecord],
    ) -> Result<Vec<Recommendation>, AnalyticsError> {
        let checked = check_records(records)?;
        self.recommendations_from(&checked)
    }

    /// Both derivations over a single validation pass.
    pub fn derive_dashboard(
        &self,
        records: &[ElasticityRecord],
        promotions: &[PromotionSummary],
    ) -> Result<(DashboardMetrics, Vec<Recommendation>), AnalyticsError> {
        let checked = check_records(records)?;
        Ok((
            self.metrics_from(&checked, promotions.len())?,
            self.recommendations_from(&checked)?,
        ))
    }

    fn metrics_from(
        &self,
        records: &[CheckedRecord<'_>],
        active_promotions: usize,
    ) -> Result<DashboardMetrics, AnalyticsError> {
        if records.is_empty() {
            tracing::warn!("No elasticity records supplied; reporting zeroed dashboard metrics.");
            return Ok(DashboardMetrics::empty(active_promotions));
        }

        let mut elasticity_sum = Decimal::ZERO;
        let mut lost_profit = Decimal::ZERO;
        let mut potential_growth = Decimal::ZERO;

        for record in records {
            accumulate(&mut elasticity_sum, record.elasticity, "elasticity sum")?;
            let change = record.money_change()?;
            if record.elasticity < self.config.elastic_threshold {
                accumulate(&mut lost_profit, change.abs(), "lost profit")?;
            } else {
                accumulate(&mut potential_growth, change, "potential growth")?;
            }
        }

        let avg_elasticity = elasticity_sum
            .checked_div(Decimal::from(records.len()))
            .ok_or_else(|| {
                AnalyticsError::Calculation("average elasticity is undefined".to_string())
            })?;

        tracing::debug!(
            records = records.len(),
            %avg_elasticity,
            %lost_profit,
            %potential_growth,
            "Derived dashboard metrics."
        );

        Ok(DashboardMetrics {
            avg_elasticity: avg_elasticity.round_dp_with_strategy(2, ROUNDING),
            lost_profit: lost_profit.round_dp_with_strategy(0, ROUNDING),
            potential_growth: potential_growth.round_dp_with_strategy(0, ROUNDING),
            active_promotions,
            record_count: records.len(),
        })
    }

    fn recommendations_from(
        &self,
        records: &[CheckedRecord<'_>],
    ) -> Result<Vec<Recommendation>, AnalyticsError> {
        let mut recommendations = records
            .iter()
            .filter(|r| r.recommended_change.abs() > self.config.materiality_threshold_pct)
            .map(|r| {
                Ok(Recommendation {
                    product: r.category.to_string(),
                    current_price: r.current_price,
                    recommended_price: r.optimum_price,
                    potential_profit: PotentialProfit {
                        absolute: r.money_change()?.abs(),
                        percentage: r.recommended_change.abs(),
                    },
                    confidence: r.confidence(&self.config)?,
                    priority: r.priority()?,
                })
            })
            .collect::<Result<Vec<_>, AnalyticsError>>()?;

        // `sort_by` is stable, so equal priorities keep the input order.
        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
        recommendations.truncate(self.config.max_recommendations);

        tracing::debug!(count = recommendations.len(), "Derived pricing recommendations.");
        Ok(recommendations)
    }
}

fn check_records(records: &[ElasticityRecord]) -> Result<Vec<CheckedRecord<'_>>, AnalyticsError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            check_record(index, record).map_err(|source| AnalyticsError::MalformedRecord {
                index,
                category: record.category.clone(),
                source,
            })
        })
        .collect()
}

fn check_record(index: usize, record: &ElasticityRecord) -> Result<CheckedRecord<'_>, CoreError> {
    record.validate()?;
    Ok(CheckedRecord {
        index,
        category: &record.category,
        elasticity: to_decimal("elasticity", record.elasticity)?,
        current_price: to_decimal("currentPrice", record.current_price)?,
        optimum_price: to_decimal("optimumPrice", record.optimum_price)?,
        recommended_change: to_decimal("recommendedChange", record.recommended_change)?,
    })
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal, CoreError> {
    Decimal::from_f64(value).ok_or_else(|| {
        CoreError::InvalidInput(
            field.to_string(),
            format!("value {} is outside the decimal range", value),
        )
    })
}
