use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The per-category output of the elasticity model and the input of the dashboard.
///
/// Numeric fields are plain floats because they come straight out of a regression;
/// they are checked with [`ElasticityRecord::validate`] before any aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticityRecord {
    pub category: String,
    /// Percentage change in demand per 1% change in price. Usually negative.
    pub elasticity: f64,
    pub current_price: f64,
    pub optimum_price: f64,
    /// `(optimum_price - current_price) / current_price * 100`.
    pub recommended_change: f64,
}

impl ElasticityRecord {
    pub fn new(
        category: impl Into<String>,
        elasticity: f64,
        current_price: f64,
        optimum_price: f64,
        recommended_change: f64,
    ) -> Self {
        Self {
            category: category.into(),
            elasticity,
            current_price,
            optimum_price,
            recommended_change,
        }
    }

    /// Rejects records carrying NaN/infinite values or negative prices.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fields = [
            ("elasticity", self.elasticity),
            ("currentPrice", self.current_price),
            ("optimumPrice", self.optimum_price),
            ("recommendedChange", self.recommended_change),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(CoreError::InvalidInput(
                    name.to_string(),
                    format!("value {} is not a finite number", value),
                ));
            }
        }
        if self.current_price < 0.0 {
            return Err(CoreError::InvalidInput(
                "currentPrice".to_string(),
                format!("price {} is negative", self.current_price),
            ));
        }
        if self.optimum_price < 0.0 {
            return Err(CoreError::InvalidInput(
                "optimumPrice".to_string(),
                format!("price {} is negative", self.optimum_price),
            ));
        }
        Ok(())
    }
}

/// One row of raw sales data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesObservation {
    pub category: String,
    pub date: NaiveDate,
    pub price: f64,
    pub quantity: f64,
    /// Unit cost, when the source knows it.
    #[serde(default)]
    pub cost: Option<f64>,
    /// Name of the promotion running when this observation was recorded.
    #[serde(default)]
    pub promotion: Option<String>,
    #[serde(default)]
    pub visits: Option<f64>,
}

impl SalesObservation {
    pub fn new(category: impl Into<String>, date: NaiveDate, price: f64, quantity: f64) -> Self {
        Self {
            category: category.into(),
            date,
            price,
            quantity,
            cost: None,
            promotion: None,
            visits: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_promotion(mut self, name: impl Into<String>) -> Self {
        self.promotion = Some(name.into());
        self
    }

    pub fn with_visits(mut self, visits: f64) -> Self {
        self.visits = Some(visits);
        self
    }

    pub fn revenue(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Effect of a single promotion on sales, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionSummary {
    pub name: String,
    pub sales_increase: Decimal,
    pub average_check: Decimal,
    pub conversion_rate: Option<Decimal>,
}

/// The four headline numbers of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub avg_elasticity: Decimal,
    pub lost_profit: Decimal,
    /// Signed: categories priced above their optimum pull this down.
    pub potential_growth: Decimal,
    pub active_promotions: usize,
    pub record_count: usize,
}

impl DashboardMetrics {
    /// The metrics of a load that produced no elasticity records.
    pub fn empty(active_promotions: usize) -> Self {
        Self {
            avg_elasticity: Decimal::new(0, 2),
            lost_profit: Decimal::ZERO,
            potential_growth: Decimal::ZERO,
            active_promotions,
            record_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotentialProfit {
    pub absolute: Decimal,
    pub percentage: Decimal,
}

/// A single actionable price change, ranked by `priority`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product: String,
    pub current_price: Decimal,
    pub recommended_price: Decimal,
    pub potential_profit: PotentialProfit,
    /// Heuristic score in `[0, 100]`.
    pub confidence: Decimal,
    pub priority: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ElasticityRecord {
        ElasticityRecord::new("Dairy", -1.2, 100.0, 90.0, -10.0)
    }

    #[test]
    fn well_formed_record_validates() {
        assert!(record().validate().is_ok());
    }

    #[test]
    fn nan_elasticity_is_rejected() {
        let mut r = record();
        r.elasticity = f64::NAN;
        let err = r.validate().unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidInput(
                "elasticity".to_string(),
                "value NaN is not a finite number".to_string()
            )
        );
    }

    #[test]
    fn infinite_change_and_negative_price_are_rejected() {
        let mut r = record();
        r.recommended_change = f64::INFINITY;
        assert!(r.validate().is_err());

        let mut r = record();
        r.current_price = -1.0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn record_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["currentPrice"], 100.0);
        assert_eq!(json["recommendedChange"], -10.0);

        let parsed: ElasticityRecord = serde_json::from_str(
            r#"{"category":"Tea","elasticity":-0.4,"currentPrice":200,"optimumPrice":210,"recommendedChange":5}"#,
        )
        .unwrap();
        assert_eq!(parsed.category, "Tea");
        assert_eq!(parsed.optimum_price, 210.0);
    }

    #[test]
    fn observation_optional_fields_default_to_none() {
        let parsed: SalesObservation = serde_json::from_str(
            r#"{"category":"Tea","date":"2024-03-01","price":2.5,"quantity":40}"#,
        )
        .unwrap();
        assert_eq!(parsed.cost, None);
        assert_eq!(parsed.promotion, None);
        assert_eq!(parsed.revenue(), 100.0);
    }

    #[test]
    fn empty_metrics_are_zeroed() {
        let m = DashboardMetrics::empty(3);
        assert!(m.is_empty());
        assert_eq!(m.active_promotions, 3);
        assert_eq!(m.lost_profit, Decimal::ZERO);
    }
}
