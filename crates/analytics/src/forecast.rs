use crate::elasticity::{check_observation, mean};
use crate::error::AnalyticsError;
use chrono::{Datelike, Days, NaiveDate};
use configuration::ForecastConfig;
use core_types::SalesObservation;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::model_selection::train_test_split;
use std::collections::BTreeMap;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Model inputs, in column order.
pub const FEATURES: [&str; 6] = ["year", "month", "day", "dayOfWeek", "weekOfYear", "price"];

/// Moves of more than this many percent over the horizon count as a trend.
const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Predicted quantity at the last observed price and at a raised and a lowered price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioForecast {
    pub current_price: f64,
    pub increased_price: f64,
    pub decreased_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// 1-based day offset from the last observed date.
    pub period: usize,
    pub date: NaiveDate,
    pub predictions: ScenarioForecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SalesTrend {
    Growth,
    Decline,
    Stable,
}

/// What the forecast says, reduced to the facts a report shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummary {
    pub trend: SalesTrend,
    /// Change of the current-price forecast from the first to the last period.
    pub trend_change_pct: f64,
    /// Arc elasticity between the lowered and raised price scenarios on the last period.
    pub price_sensitivity: f64,
    pub price_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesForecast {
    pub category: String,
    /// `100 - MAPE` on the held-out observations, in percent.
    pub accuracy: f64,
    /// Share of the permutation error attributed to each input.
    pub feature_importance: BTreeMap<String, f64>,
    pub points: Vec<ForecastPoint>,
    pub summary: ForecastSummary,
}

/// Forecasts daily quantity per category with a random-forest regressor over calendar
/// features and price.
#[derive(Debug, Clone, Default)]
pub struct SalesForecaster {
    config: ForecastConfig,
}

impl SalesForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Forecasts every category with at least `min_observations` observations, ordered
    /// by category name. Smaller categories are skipped.
    pub fn forecast(
        &self,
        observations: &[SalesObservation],
    ) -> Result<Vec<SalesForecast>, AnalyticsError> {
        let mut groups: BTreeMap<&str, Vec<&SalesObservation>> = BTreeMap::new();
        for obs in observations {
            check_observation(obs)?;
            groups.entry(obs.category.as_str()).or_default().push(obs);
        }

        let mut forecasts = Vec::with_capacity(groups.len());
        for (category, mut group) in groups {
            if group.len() < self.config.min_observations {
                tracing::debug!(
                    category,
                    observations = group.len(),
                    "Too few observations to forecast."
                );
                continue;
            }
            group.sort_by_key(|o| o.date);
            forecasts.push(self.forecast_category(category, &group)?);
        }

        tracing::debug!(forecasts = forecasts.len(), "Forecast category sales.");
        Ok(forecasts)
    }

    fn forecast_category(
        &self,
        category: &str,
        group: &[&SalesObservation],
    ) -> Result<SalesForecast, AnalyticsError> {
        let failed = |stage: &str, e: smartcore::error::Failed| {
            AnalyticsError::Calculation(format!("forecast of '{category}' failed to {stage}: {e}"))
        };

        let features = feature_matrix(group.iter().map(|o| (o.date, o.price)));
        let targets: Vec<f64> = group.iter().map(|o| o.quantity).collect();
        let x = to_dense(&features).map_err(|e| failed("build features", e))?;

        let (x_train, x_test, y_train, y_test) =
            train_test_split(&x, &targets, self.config.test_size, true, Some(self.config.seed));
        let n_trees = self.config.n_trees.try_into().map_err(|_| {
            AnalyticsError::Calculation(format!("{} trees is too many", self.config.n_trees))
        })?;
        let mut params = RandomForestRegressorParameters::default().with_n_trees(n_trees);
        params.seed = self.config.seed;
        let model = Forest::fit(&x_train, &y_train, params).map_err(|e| failed("fit", e))?;

        let held_out = model.predict(&x_test).map_err(|e| failed("predict", e))?;
        let accuracy = 100.0 - mape(&y_test, &held_out) * 100.0;
        let feature_importance =
            permutation_importance(&model, &features, &targets).map_err(|e| failed("score", e))?;
        let points = self.project(&model, group).map_err(|e| failed("project", e))?;
        let summary = self.summarize(&points);

        tracing::debug!(category, accuracy, "Sales forecast trained.");
        Ok(SalesForecast {
            category: category.to_string(),
            accuracy,
            feature_importance,
            points,
            summary,
        })
    }

    /// Predicts each of the next `periods` days under the three price scenarios.
    fn project(
        &self,
        model: &Forest,
        group: &[&SalesObservation],
    ) -> Result<Vec<ForecastPoint>, smartcore::error::Failed> {
        let Some(last) = group.last() else {
            return Ok(Vec::new());
        };
        let step = self.config.scenario_step;
        let prices = [last.price, last.price * (1.0 + step), last.price * (1.0 - step)];
        let dates: Vec<NaiveDate> = (1..=self.config.periods)
            .map_while(|i| last.date.checked_add_days(Days::new(i as u64)))
            .collect();

        let rows = dates
            .iter()
            .flat_map(|&date| prices.iter().map(move |&price| (date, price)));
        let predicted = model.predict(&to_dense(&feature_matrix(rows))?)?;

        Ok(dates
            .into_iter()
            .zip(predicted.chunks_exact(prices.len()))
            .enumerate()
            .map(|(i, (date, p))| ForecastPoint {
                period: i + 1,
                date,
                predictions: ScenarioForecast {
                    current_price: p[0],
                    increased_price: p[1],
                    decreased_price: p[2],
                },
            })
            .collect())
    }

    fn summarize(&self, points: &[ForecastPoint]) -> ForecastSummary {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return ForecastSummary {
                trend: SalesTrend::Stable,
                trend_change_pct: 0.0,
                price_sensitivity: 0.0,
                price_sensitive: false,
            };
        };

        let start = first.predictions.current_price;
        let end = last.predictions.current_price;
        let trend_change_pct = if start != 0.0 { (end - start) / start * 100.0 } else { 0.0 };
        let trend = if trend_change_pct > TREND_THRESHOLD_PCT {
            SalesTrend::Growth
        } else if trend_change_pct < -TREND_THRESHOLD_PCT {
            SalesTrend::Decline
        } else {
            SalesTrend::Stable
        };

        let p = last.predictions;
        let price_sensitivity = if p.current_price != 0.0 {
            (p.decreased_price - p.increased_price) / p.current_price
                / (2.0 * self.config.scenario_step)
        } else {
            0.0
        };

        ForecastSummary {
            trend,
            trend_change_pct,
            price_sensitivity,
            price_sensitive: price_sensitivity.abs() > 1.0,
        }
    }
}

/// Mean forecast accuracy over all categories, if any were forecast.
pub fn overall_accuracy(forecasts: &[SalesForecast]) -> Option<f64> {
    let accuracies: Vec<f64> = forecasts.iter().map(|f| f.accuracy).collect();
    (!accuracies.is_empty()).then(|| mean(&accuracies))
}

fn feature_matrix(rows: impl Iterator<Item = (NaiveDate, f64)>) -> Array2<f64> {
    let mut values = Vec::new();
    for (date, price) in rows {
        values.extend([
            f64::from(date.year()),
            f64::from(date.month()),
            f64::from(date.day()),
            f64::from(date.weekday().num_days_from_monday()),
            f64::from(date.iso_week().week()),
            price,
        ]);
    }
    let n_rows = values.len() / FEATURES.len();
    Array2::from_shape_vec((n_rows, FEATURES.len()), values)
        .unwrap_or_else(|_| Array2::zeros((0, FEATURES.len())))
}

fn to_dense(features: &Array2<f64>) -> Result<DenseMatrix<f64>, smartcore::error::Failed> {
    DenseMatrix::new(
        features.nrows(),
        features.ncols(),
        features.iter().copied().collect(),
        false,
    )
}

/// Mean absolute percentage error as a fraction. Targets are positive quantities.
fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum();
    total / actual.len() as f64
}

/// Error increase when each input column is rotated by half its length, normalised to
/// shares that sum to one. All zeros when no column matters.
fn permutation_importance(
    model: &Forest,
    features: &Array2<f64>,
    targets: &[f64],
) -> Result<BTreeMap<String, f64>, smartcore::error::Failed> {
    let baseline = mape(targets, &model.predict(&to_dense(features)?)?);
    let shift = features.nrows() / 2;

    let mut increases = Vec::with_capacity(FEATURES.len());
    for column in 0..features.ncols() {
        let original = features.column(column).to_vec();
        let mut permuted = features.clone();
        for (row, value) in permuted.column_mut(column).iter_mut().enumerate() {
            *value = original[(row + shift) % original.len()];
        }
        let error = mape(targets, &model.predict(&to_dense(&permuted)?)?);
        increases.push((error - baseline).max(0.0));
    }

    let total: f64 = increases.iter().sum();
    Ok(FEATURES
        .iter()
        .zip(increases)
        .map(|(name, increase)| {
            let share = if total > 0.0 { increase / total } else { 0.0 };
            (name.to_string(), share)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sixty days of linear demand `q = 200 - 10p` over eight repeating prices.
    fn daily_sales(category: &str) -> Vec<SalesObservation> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        (0..60u64)
            .map(|i| {
                let price = 8.0 + (i % 8) as f64;
                let date = start.checked_add_days(Days::new(i)).unwrap();
                SalesObservation::new(category, date, price, 200.0 - 10.0 * price)
            })
            .collect()
    }

    #[test]
    fn forecasts_each_period_after_the_last_date() {
        let forecaster = SalesForecaster::default();
        let forecasts = forecaster.forecast(&daily_sales("Juice")).unwrap();
        assert_eq!(forecasts.len(), 1);

        let juice = &forecasts[0];
        assert_eq!(juice.category, "Juice");
        assert_eq!(juice.points.len(), 30);
        assert_eq!(juice.points[0].period, 1);
        assert_eq!(juice.points[0].date, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(juice.points[29].date, NaiveDate::from_ymd_opt(2024, 5, 29).unwrap());
        for point in &juice.points {
            assert!(point.predictions.current_price.is_finite());
        }
    }

    #[test]
    fn price_driven_demand_is_forecast_accurately() {
        let forecasts = SalesForecaster::default().forecast(&daily_sales("Juice")).unwrap();
        let juice = &forecasts[0];
        assert!(juice.accuracy > 50.0, "accuracy {}", juice.accuracy);

        let shares: f64 = juice.feature_importance.values().sum();
        assert!(shares == 0.0 || (shares - 1.0).abs() < 1e-9);
        assert_eq!(juice.feature_importance.len(), FEATURES.len());
    }

    #[test]
    fn same_seed_gives_same_forecast() {
        let forecaster = SalesForecaster::default();
        let first = forecaster.forecast(&daily_sales("Juice")).unwrap();
        let second = forecaster.forecast(&daily_sales("Juice")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn small_categories_are_skipped() {
        let mut observations = daily_sales("Juice");
        observations.extend(daily_sales("Water").into_iter().take(3));
        let forecasts = SalesForecaster::default().forecast(&observations).unwrap();
        let categories: Vec<&str> = forecasts.iter().map(|f| f.category.as_str()).collect();
        assert_eq!(categories, vec!["Juice"]);
    }

    #[test]
    fn summary_classifies_trend_and_sensitivity() {
        let forecaster = SalesForecaster::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let point = |period, current, increased, decreased| ForecastPoint {
            period,
            date,
            predictions: ScenarioForecast {
                current_price: current,
                increased_price: increased,
                decreased_price: decreased,
            },
        };

        // 100 -> 120 is growth; (130 - 100) / 120 / 0.1 = 2.5 is sensitive.
        let summary = forecaster.summarize(&[
            point(1, 100.0, 95.0, 105.0),
            point(2, 120.0, 100.0, 130.0),
        ]);
        assert_eq!(summary.trend, SalesTrend::Growth);
        assert!((summary.trend_change_pct - 20.0).abs() < 1e-9);
        assert!((summary.price_sensitivity - 2.5).abs() < 1e-9);
        assert!(summary.price_sensitive);

        let summary = forecaster.summarize(&[
            point(1, 100.0, 99.0, 101.0),
            point(2, 97.0, 96.0, 98.0),
        ]);
        assert_eq!(summary.trend, SalesTrend::Stable);
        assert!(!summary.price_sensitive);
    }

    #[test]
    fn overall_accuracy_is_the_mean() {
        assert_eq!(overall_accuracy(&[]), None);
        let forecasts = SalesForecaster::default().forecast(&daily_sales("Juice")).unwrap();
        assert_eq!(overall_accuracy(&forecasts), Some(forecasts[0].accuracy));
    }
}
