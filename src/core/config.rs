#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::squash::Squash;

/// Learning rate used when a caller does not pick one.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Construction-time settings for a [`Graph`](crate::graph::Graph).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GraphConfig {
    /// If set, makes weight/bias initialization reproducible.
    pub seed: Option<u64>,

    /// Random weights and biases are drawn uniformly from `[-init_range, init_range)`.
    pub init_range: f64,

    /// Rate used by `Graph::propagate`.
    pub learning_rate: f64,

    /// Squash given to neurons created without an explicit one.
    pub squash: Squash,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            seed: None,
            init_range: 1.0,
            learning_rate: DEFAULT_LEARNING_RATE,
            squash: Squash::Logistic,
        }
    }
}

impl GraphConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn with_init_range(mut self, range: f64) -> Self {
        self.init_range = range;
        self
    }

    pub fn with_squash(mut self, squash: Squash) -> Self {
        self.squash = squash;
        self
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.init_range.is_finite() || self.init_range <= 0.0 {
            return Err(GraphError::InvalidConfig(
                "init_range must be finite and > 0",
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(GraphError::InvalidConfig(
                "learning_rate must be finite and > 0",
            ));
        }
        Ok(())
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    ///
    /// ```
    /// use gatenet::config::GraphConfig;
    /// use gatenet::squash::Squash;
    ///
    /// let cfg = GraphConfig::from_json_str(r#"{ "seed": 3, "squash": "tanh" }"#).unwrap();
    /// assert_eq!(cfg.seed, Some(3));
    /// assert_eq!(cfg.squash, Squash::Tanh);
    /// ```
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let cfg: GraphConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
