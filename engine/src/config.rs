//! Engine configuration

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Configuration of sampling, seeding and structural mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Maximum number of actions in one individual
    pub max_test_size: usize,
    /// Chance that ADD follows a recorded dependency
    pub prob_of_dependency_heuristics: f64,
    /// Below this many rows a table gets a fresh insert
    pub min_row_of_table: usize,
    /// Chance of selecting an existing row instead of inserting one
    pub prob_of_select_from_db: f64,
    /// Chance of appending a second PATCH to creating templates
    pub prob_extra_patch: f64,
    /// Chance that a self relation is followed by ADD
    pub prob_self_relation: f64,
    /// Split camelCase path tokens when matching tables
    pub apply_token_parser: bool,
    /// Seed calls with database actions
    pub involve_db: bool,
    /// Minimum similarity between a name and a table or column
    pub similarity_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_test_size: 10,
            prob_of_dependency_heuristics: 0.5,
            min_row_of_table: 10,
            prob_of_select_from_db: 0.5,
            prob_extra_patch: 0.1,
            prob_self_relation: 0.2,
            apply_token_parser: true,
            involve_db: true,
            similarity_threshold: 0.6,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_test_size(mut self, size: usize) -> Self {
        self.max_test_size = size;
        self
    }

    pub fn with_dependency_heuristics(mut self, probability: f64) -> Self {
        self.prob_of_dependency_heuristics = probability;
        self
    }

    pub fn with_min_row_of_table(mut self, rows: usize) -> Self {
        self.min_row_of_table = rows;
        self
    }

    pub fn with_select_from_db(mut self, probability: f64) -> Self {
        self.prob_of_select_from_db = probability;
        self
    }

    pub fn with_extra_patch(mut self, probability: f64) -> Self {
        self.prob_extra_patch = probability;
        self
    }

    pub fn with_involve_db(mut self, involve: bool) -> Self {
        self.involve_db = involve;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Short tests, no database and no heuristics.
    pub fn minimal() -> Self {
        Self {
            max_test_size: 4,
            prob_of_dependency_heuristics: 0.0,
            prob_extra_patch: 0.0,
            involve_db: false,
            ..Self::default()
        }
    }

    pub fn thorough() -> Self {
        Self {
            max_test_size: 20,
            prob_of_dependency_heuristics: 0.8,
            min_row_of_table: 20,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_test_size == 0 {
            return Err(EngineError::invalid_config("max_test_size must be positive"));
        }
        let probabilities = [
            ("prob_of_dependency_heuristics", self.prob_of_dependency_heuristics),
            ("prob_of_select_from_db", self.prob_of_select_from_db),
            ("prob_extra_patch", self.prob_extra_patch),
            ("prob_self_relation", self.prob_self_relation),
            ("similarity_threshold", self.similarity_threshold),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::invalid_config(format!(
                    "{} must be within [0,1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"seed": 7, "involve_db": false}"#).unwrap();
        assert_eq!(config, EngineConfig::new().with_seed(7).with_involve_db(false));
    }

    #[test]
    fn presets_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::minimal().validate().is_ok());
        assert!(EngineConfig::thorough().validate().is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(EngineConfig::new().with_extra_patch(1.5).validate().is_err());
        assert!(EngineConfig::new().with_max_test_size(0).validate().is_err());
        assert!(EngineConfig::new().with_similarity_threshold(f64::NAN).validate().is_err());
    }
}
