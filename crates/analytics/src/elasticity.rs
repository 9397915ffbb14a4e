use crate::error::AnalyticsError;
use chrono::Datelike;
use configuration::EstimationConfig;
use core_types::{ElasticityClass, ElasticityRecord, SalesObservation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The fitted demand response of a single category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticityEstimate {
    pub category: String,
    pub elasticity: f64,
    pub class: ElasticityClass,
    pub observations: usize,
    /// The record handed to the dashboard, including the optimum price.
    pub record: ElasticityRecord,
    /// Mean unit cost of the category, zero when no cost was recorded.
    pub unit_cost: f64,
    /// Mean quantity sold at the current prices.
    pub current_quantity: f64,
    /// Quantity the linear demand fit predicts at the optimum price.
    pub expected_quantity: f64,
    pub quantity_change_percent: f64,
}

impl ElasticityEstimate {
    fn profit(&self, price: f64, quantity: f64) -> f64 {
        (price - self.unit_cost) * quantity
    }
}

/// Portfolio-wide effect of moving every category to its optimum price.
///
/// A figure is `None` when its current baseline is not positive, since a relative
/// change against it is meaningless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOptimization {
    pub current_profit: f64,
    pub optimized_profit: f64,
    pub expected_profit_increase: Option<f64>,
    pub current_revenue: f64,
    pub optimized_revenue: f64,
    pub expected_revenue_change: Option<f64>,
}

/// Elasticities fitted within a single calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyElasticity {
    /// `YYYY-MM`.
    pub month: String,
    pub elasticities: BTreeMap<String, f64>,
    pub average: f64,
}

/// Categories split into elasticity terciles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segmentation {
    pub low: Vec<String>,
    pub medium: Vec<String>,
    pub high: Vec<String>,
}

/// Estimates price elasticity and a profit-maximising price per category.
///
/// Elasticity is the slope of a least-squares fit of `ln(quantity)` on `ln(price)`.
/// The optimum price comes from a separate linear demand fit `q = a + b·p`, which has
/// a closed-form profit maximum at `p* = (cost - a/b) / 2` whenever `b < 0`.
#[derive(Debug, Clone, Default)]
pub struct ElasticityEstimator {
    config: EstimationConfig,
}

impl ElasticityEstimator {
    pub fn new(config: EstimationConfig) -> Self {
        Self { config }
    }

    /// Fits every category found in `observations`. The result is ordered by category name.
    pub fn estimate(
        &self,
        observations: &[SalesObservation],
    ) -> Result<Vec<ElasticityEstimate>, AnalyticsError> {
        let mut groups: BTreeMap<&str, Vec<&SalesObservation>> = BTreeMap::new();
        for obs in observations {
            check_observation(obs)?;
            groups.entry(obs.category.as_str()).or_default().push(obs);
        }

        let estimates: Vec<ElasticityEstimate> = groups
            .into_iter()
            .map(|(category, group)| self.estimate_category(category, &group))
            .collect();

        tracing::debug!(
            observations = observations.len(),
            categories = estimates.len(),
            "Estimated category elasticities."
        );
        Ok(estimates)
    }

    fn estimate_category(&self, category: &str, group: &[&SalesObservation]) -> ElasticityEstimate {
        let prices: Vec<f64> = group.iter().map(|o| o.price).collect();
        let quantities: Vec<f64> = group.iter().map(|o| o.quantity).collect();
        let current_price = mean(&prices);
        let current_quantity = mean(&quantities);
        let costs: Vec<f64> = group.iter().filter_map(|o| o.cost).collect();
        let unit_cost = if costs.is_empty() { 0.0 } else { mean(&costs) };

        let fittable = group.len() >= self.config.min_observations && distinct_count(&prices) > 1;

        let (elasticity, (optimum_price, expected_quantity)) = if fittable {
            let optimum = optimal_price(&prices, &quantities, unit_cost)
                .unwrap_or((current_price, current_quantity));
            (log_log_slope(&prices, &quantities), optimum)
        } else {
            tracing::debug!(category, "Not enough price variation to fit elasticity.");
            (0.0, (current_price, current_quantity))
        };

        let recommended_change = (optimum_price - current_price) / current_price * 100.0;
        let quantity_change_percent =
            (expected_quantity - current_quantity) / current_quantity * 100.0;

        ElasticityEstimate {
            category: category.to_string(),
            elasticity,
            class: ElasticityClass::from_elasticity(elasticity),
            observations: group.len(),
            record: ElasticityRecord::new(
                category,
                elasticity,
                current_price,
                optimum_price,
                recommended_change,
            ),
            unit_cost,
            current_quantity,
            expected_quantity,
            quantity_change_percent,
        }
    }

    /// Totals current and optimized profit and revenue over all categories.
    pub fn optimization(&self, estimates: &[ElasticityEstimate]) -> PriceOptimization {
        let mut totals = PriceOptimization::default();
        for e in estimates {
            totals.current_profit += e.profit(e.record.current_price, e.current_quantity);
            totals.optimized_profit += e.profit(e.record.optimum_price, e.expected_quantity);
            totals.current_revenue += e.record.current_price * e.current_quantity;
            totals.optimized_revenue += e.record.optimum_price * e.expected_quantity;
        }
        totals.expected_profit_increase =
            relative_change(totals.current_profit, totals.optimized_profit);
        totals.expected_revenue_change =
            relative_change(totals.current_revenue, totals.optimized_revenue);
        totals
    }

    /// Refits every category separately within each calendar month.
    ///
    /// Only categories whose price varied within the month are fitted, and months
    /// without any such category are left out. Data spanning a single date has no
    /// month-to-month view and yields an empty list.
    pub fn by_month(
        &self,
        observations: &[SalesObservation],
    ) -> Result<Vec<MonthlyElasticity>, AnalyticsError> {
        for obs in observations {
            check_observation(obs)?;
        }
        let dates: BTreeSet<_> = observations.iter().map(|o| o.date).collect();
        if dates.len() <= 1 {
            return Ok(Vec::new());
        }

        let mut months: BTreeMap<(i32, u32), BTreeMap<&str, Vec<&SalesObservation>>> =
            BTreeMap::new();
        for obs in observations {
            months
                .entry((obs.date.year(), obs.date.month()))
                .or_default()
                .entry(obs.category.as_str())
                .or_default()
                .push(obs);
        }

        let monthly: Vec<MonthlyElasticity> = months
            .into_iter()
            .filter_map(|((year, month), categories)| {
                let elasticities: BTreeMap<String, f64> = categories
                    .into_iter()
                    .filter_map(|(category, group)| {
                        let prices: Vec<f64> = group.iter().map(|o| o.price).collect();
                        if distinct_count(&prices) <= 1 {
                            return None;
                        }
                        let quantities: Vec<f64> = group.iter().map(|o| o.quantity).collect();
                        Some((category.to_string(), log_log_slope(&prices, &quantities)))
                    })
                    .collect();
                if elasticities.is_empty() {
                    return None;
                }
                let values: Vec<f64> = elasticities.values().copied().collect();
                Some(MonthlyElasticity {
                    month: format!("{year:04}-{month:02}"),
                    average: mean(&values),
                    elasticities,
                })
            })
            .collect();

        tracing::debug!(months = monthly.len(), "Estimated monthly elasticities.");
        Ok(monthly)
    }

    /// Splits categories at the 33rd and 66th percentile of their elasticities.
    pub fn segment(&self, estimates: &[ElasticityEstimate]) -> Segmentation {
        if estimates.is_empty() {
            return Segmentation::default();
        }
        let mut values: Vec<f64> = estimates.iter().map(|e| e.elasticity).collect();
        values.sort_by(f64::total_cmp);
        let low_threshold = percentile(&values, 33.0);
        let high_threshold = percentile(&values, 66.0);

        let mut segmentation = Segmentation::default();
        for estimate in estimates {
            let bucket = if estimate.elasticity <= low_threshold {
                &mut segmentation.low
            } else if estimate.elasticity <= high_threshold {
                &mut segmentation.medium
            } else {
                &mut segmentation.high
            };
            bucket.push(estimate.category.clone());
        }
        segmentation
    }
}

/// The elasticity records of a set of estimates, in the same order.
pub fn records_of(estimates: &[ElasticityEstimate]) -> Vec<ElasticityRecord> {
    estimates.iter().map(|e| e.record.clone()).collect()
}

pub(crate) fn check_observation(obs: &SalesObservation) -> Result<(), AnalyticsError> {
    let invalid = |reason: String| AnalyticsError::InvalidObservation {
        category: obs.category.clone(),
        reason,
    };
    if !obs.price.is_finite() || obs.price <= 0.0 {
        return Err(invalid(format!("price {} on {} must be positive", obs.price, obs.date)));
    }
    if !obs.quantity.is_finite() || obs.quantity <= 0.0 {
        return Err(invalid(format!(
            "quantity {} on {} must be positive",
            obs.quantity, obs.date
        )));
    }
    if let Some(cost) = obs.cost {
        if !cost.is_finite() || cost < 0.0 {
            return Err(invalid(format!("cost {} on {} must not be negative", cost, obs.date)));
        }
    }
    if let Some(visits) = obs.visits {
        if !visits.is_finite() || visits < 0.0 {
            return Err(invalid(format!("visits {} on {} must not be negative", visits, obs.date)));
        }
    }
    Ok(())
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

/// Percentage change from `current` to `optimized`, if `current` is positive.
fn relative_change(current: f64, optimized: f64) -> Option<f64> {
    (current > 0.0).then(|| (optimized - current) / current * 100.0)
}

/// Slope of `ln(quantity)` on `ln(price)`.
fn log_log_slope(prices: &[f64], quantities: &[f64]) -> f64 {
    let log_prices: Vec<f64> = prices.iter().map(|p| p.ln()).collect();
    let log_quantities: Vec<f64> = quantities.iter().map(|q| q.ln()).collect();
    least_squares(&log_prices, &log_quantities).0
}

/// Ordinary least squares for `y = intercept + slope·x`. Returns `(slope, intercept)`.
fn least_squares(x: &[f64], y: &[f64]) -> (f64, f64) {
    let x_mean = mean(x);
    let y_mean = mean(y);
    let (covariance, variance) = x
        .iter()
        .zip(y)
        .fold((0.0, 0.0), |(cov, var), (xi, yi)| {
            let dx = xi - x_mean;
            (cov + dx * (yi - y_mean), var + dx * dx)
        });
    let slope = covariance / variance;
    (slope, y_mean - slope * x_mean)
}

/// Profit-maximising price under linear demand and the demand predicted there, or `None`
/// when the fit does not slope down or the optimum implies a non-positive price or
/// negative demand.
fn optimal_price(prices: &[f64], quantities: &[f64], unit_cost: f64) -> Option<(f64, f64)> {
    let (slope, intercept) = least_squares(prices, quantities);
    if !slope.is_finite() || slope >= 0.0 {
        return None;
    }
    let price = (unit_cost - intercept / slope) / 2.0;
    let demand = intercept + slope * price;
    (price.is_finite() && price > 0.0 && demand >= 0.0).then_some((price, demand))
}

/// Percentile of sorted values with linear interpolation between closest ranks.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}
