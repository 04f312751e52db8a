use crate::categories::CategoryTables;
use crate::error::Result;
use crate::projection::{AdequacyBand, ProjectionEngine, SkipRule, WeightTable};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Read-only configuration shared by every aggregation and projection call.
/// Missing sections fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub categories: CategoryTables,

    #[serde(default = "WeightTable::expense_default")]
    pub expense_weights: WeightTable,

    #[serde(default = "WeightTable::revenue_default")]
    pub revenue_weights: WeightTable,

    #[serde(default)]
    pub band: AdequacyBand,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            categories: CategoryTables::default(),
            expense_weights: WeightTable::expense_default(),
            revenue_weights: WeightTable::revenue_default(),
            band: AdequacyBand::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        info!("Loaded dashboard config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.expense_weights.validate()?;
        self.revenue_weights.validate()?;
        self.band.validate()
    }

    pub fn expense_engine(&self) -> ProjectionEngine {
        ProjectionEngine::new(self.expense_weights.clone(), self.band, SkipRule::RequireBoth)
    }

    pub fn revenue_engine(&self) -> ProjectionEngine {
        ProjectionEngine::new(
            self.revenue_weights.clone(),
            self.band,
            SkipRule::RequireDecember,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BudgetError;

    #[test]
    fn test_default_config_round_trips_json() {
        let config = DashboardConfig::default();
        let json = config.to_json_string().unwrap();
        let back = DashboardConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = DashboardConfig::from_json_str("{}").unwrap();
        assert_eq!(config.expense_weights, WeightTable::expense_default());
        assert_eq!(config.revenue_weights.ranks(), 3);
        assert_eq!(config.band, AdequacyBand::default());
        assert_eq!(config.expense_engine(), ProjectionEngine::expense());
        assert_eq!(config.revenue_engine(), ProjectionEngine::revenue());
    }

    #[test]
    fn test_zero_weight_rejected() {
        let err = DashboardConfig::from_json_str(r#"{"expense_weights": [0.4, 0.0]}"#).unwrap_err();
        assert!(matches!(err, BudgetError::InvalidWeightTable(_)));
    }

    #[test]
    fn test_six_rank_weight_table_rejected() {
        let err = DashboardConfig::from_json_str(
            r#"{"revenue_weights": [0.3, 0.2, 0.2, 0.1, 0.1, 0.1]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BudgetError::InvalidWeightTable(_)));
    }

    #[test]
    fn test_inverted_band_rejected() {
        let err = DashboardConfig::from_json_str(r#"{"band": {"lower": 110, "upper": 90}}"#)
            .unwrap_err();
        assert!(matches!(err, BudgetError::InvalidAdequacyBand { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DashboardConfig::from_path("/nonexistent/dashboard.json").unwrap_err();
        assert!(matches!(err, BudgetError::IoError(_)));
    }
}
