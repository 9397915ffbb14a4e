use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::net::SocketAddr;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `pricelens.toml`; a missing section falls back to
/// the defaults below, which match the behaviour of the hosted dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub derivation: DerivationConfig,
    #[serde(default)]
    pub estimation: EstimationConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Parameters of the dashboard metrics and recommendation derivation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DerivationConfig {
    /// Records with an elasticity strictly below this count towards lost profit,
    /// all others towards potential growth.
    pub elastic_threshold: Decimal,
    /// A price change must exceed this many percent to be worth recommending.
    pub materiality_threshold_pct: Decimal,
    pub max_recommendations: usize,
    /// Confidence points per unit of absolute elasticity.
    pub confidence_scale: Decimal,
    pub confidence_cap: Decimal,
}

/// Parameters of the per-category elasticity regression.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Categories with fewer observations are reported with an elasticity of zero.
    pub min_observations: usize,
}

/// Parameters of the random-forest sales forecast.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days forecast past the last observed date.
    pub periods: usize,
    /// Categories with fewer observations are not forecast.
    pub min_observations: usize,
    pub n_trees: usize,
    /// Share of observations held out to measure accuracy.
    pub test_size: f32,
    /// Seeds both the hold-out split and the forest, so reruns agree.
    pub seed: u64,
    /// Relative price move of the raised and lowered price scenarios.
    pub scenario_step: f64,
}

/// Thresholds for the colour bands used by the dashboard tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub confidence_high: Decimal,
    pub confidence_medium: Decimal,
    pub priority_urgent: Decimal,
    pub priority_elevated: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

// --- Default Implementations ---

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            elastic_threshold: dec!(-1),
            materiality_threshold_pct: dec!(5),
            max_recommendations: 5,
            confidence_scale: dec!(50),
            confidence_cap: dec!(100),
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self { min_observations: 2 }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            periods: 30,
            min_observations: 10,
            n_trees: 100,
            test_size: 0.2,
            seed: 42,
            scenario_step: 0.05,
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            confidence_high: dec!(90),
            confidence_medium: dec!(70),
            priority_urgent: dec!(8),
            priority_elevated: dec!(5),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

impl Config {
    /// Checks the cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.derivation;
        if d.materiality_threshold_pct.is_sign_negative() {
            return Err(ConfigError::ValidationError(
                "derivation.materiality_threshold_pct must not be negative".to_string(),
            ));
        }
        if d.confidence_scale <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "derivation.confidence_scale must be positive".to_string(),
            ));
        }
        if d.confidence_cap <= Decimal::ZERO || d.confidence_cap > dec!(100) {
            return Err(ConfigError::ValidationError(
                "derivation.confidence_cap must be in (0, 100]".to_string(),
            ));
        }
        if self.estimation.min_observations < 2 {
            return Err(ConfigError::ValidationError(
                "estimation.min_observations must be at least 2 to fit a slope".to_string(),
            ));
        }
        let f = &self.forecast;
        if f.periods == 0 || f.n_trees == 0 {
            return Err(ConfigError::ValidationError(
                "forecast.periods and forecast.n_trees must be positive".to_string(),
            ));
        }
        if !(f.test_size > 0.0 && f.test_size < 1.0) {
            return Err(ConfigError::ValidationError(
                "forecast.test_size must be in (0, 1)".to_string(),
            ));
        }
        if f.min_observations < 5 {
            return Err(ConfigError::ValidationError(
                "forecast.min_observations must be at least 5 to hold out a test set".to_string(),
            ));
        }
        if !(f.scenario_step > 0.0 && f.scenario_step < 1.0) {
            return Err(ConfigError::ValidationError(
                "forecast.scenario_step must be in (0, 1)".to_string(),
            ));
        }
        let p = &self.presentation;
        if p.confidence_medium > p.confidence_high {
            return Err(ConfigError::ValidationError(
                "presentation.confidence_medium must not exceed confidence_high".to_string(),
            ));
        }
        if p.priority_elevated > p.priority_urgent {
            return Err(ConfigError::ValidationError(
                "presentation.priority_elevated must not exceed priority_urgent".to_string(),
            ));
        }
        Ok(())
    }
}
