use serde::{Deserialize, Serialize};

/// How strongly demand for a category reacts to price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElasticityClass {
    /// `|elasticity| > 1`: demand moves more than price does.
    Elastic,
    Inelastic,
}

impl ElasticityClass {
    /// Classifies an elasticity coefficient by its magnitude.
    pub fn from_elasticity(elasticity: f64) -> Self {
        if elasticity.abs() > 1.0 {
            ElasticityClass::Elastic
        } else {
            ElasticityClass::Inelastic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_elasticity_is_inelastic() {
        assert_eq!(ElasticityClass::from_elasticity(-1.0), ElasticityClass::Inelastic);
        assert_eq!(ElasticityClass::from_elasticity(-1.01), ElasticityClass::Elastic);
        assert_eq!(ElasticityClass::from_elasticity(1.5), ElasticityClass::Elastic);
        assert_eq!(ElasticityClass::from_elasticity(0.0), ElasticityClass::Inelastic);
    }
}
