//! Blend weights for the four scoring signals and the validated store that
//! holds the current session's configuration.

use crate::error::{RgrError, RgrResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Allowed distance of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Weights {
    pub rule: f64,
    pub graph: f64,
    #[serde(alias = "rl_exploit")]
    pub rl_exploit: f64,
    #[serde(alias = "rl_explore")]
    pub rl_explore: f64,
}

impl Weights {
    pub const DEFAULT: Weights = Weights {
        rule: 0.42,
        graph: 0.38,
        rl_exploit: 0.15,
        rl_explore: 0.05,
    };

    pub fn sum(&self) -> f64 {
        self.rule + self.graph + self.rl_exploit + self.rl_explore
    }

    /// Reject weight tuples that are negative, non-finite, or do not sum to
    /// 1.0 within [`WEIGHT_SUM_TOLERANCE`]. Nothing is clamped.
    pub fn validate(self) -> RgrResult<Self> {
        let parts = [self.rule, self.graph, self.rl_exploit, self.rl_explore];
        if parts.iter().any(|w| !w.is_finite()) {
            return Err(RgrError::invalid("weights must be finite numbers"));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RgrError::invalid(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        if parts.iter().any(|w| *w < 0.0) {
            return Err(RgrError::invalid("all weights must be non-negative"));
        }
        Ok(self)
    }

    /// Rescale so the four weights sum to exactly 1. A zero (or negative)
    /// total yields all-zero weights instead of dividing by zero.
    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Self {
                rule: 0.0,
                graph: 0.0,
                rl_exploit: 0.0,
                rl_explore: 0.0,
            };
        }
        Self {
            rule: self.rule / sum,
            graph: self.graph / sum,
            rl_exploit: self.rl_exploit / sum,
            rl_explore: self.rl_explore / sum,
        }
    }

    /// Overlay a partial update onto these weights (no validation).
    pub fn merged(&self, patch: &WeightsPatch) -> Self {
        Self {
            rule: patch.rule.unwrap_or(self.rule),
            graph: patch.graph.unwrap_or(self.graph),
            rl_exploit: patch.rl_exploit.unwrap_or(self.rl_exploit),
            rl_explore: patch.rl_explore.unwrap_or(self.rl_explore),
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Partial weight update; absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightsPatch {
    #[serde(default)]
    pub rule: Option<f64>,
    #[serde(default)]
    pub graph: Option<f64>,
    #[serde(default, alias = "rl_exploit")]
    pub rl_exploit: Option<f64>,
    #[serde(default, alias = "rl_explore")]
    pub rl_explore: Option<f64>,
}

impl WeightsPatch {
    pub fn is_empty(&self) -> bool {
        self.rule.is_none()
            && self.graph.is_none()
            && self.rl_exploit.is_none()
            && self.rl_explore.is_none()
    }
}

/// Current blend weights for one recommendation context.
///
/// Reads hand out copies; writes are validated first and leave the stored
/// weights untouched on rejection.
pub struct WeightStore {
    current: RwLock<Weights>,
}

impl WeightStore {
    pub fn new(initial: Weights) -> RgrResult<Self> {
        Ok(Self {
            current: RwLock::new(initial.validate()?),
        })
    }

    pub fn get(&self) -> Weights {
        *self.current.read()
    }

    /// Current weights rescaled to sum to exactly 1.
    pub fn normalized(&self) -> Weights {
        self.current.read().normalized()
    }

    pub fn set(&self, weights: Weights) -> RgrResult<Weights> {
        let validated = weights.validate()?;
        *self.current.write() = validated;
        info!(
            rule = validated.rule,
            graph = validated.graph,
            rl_exploit = validated.rl_exploit,
            rl_explore = validated.rl_explore,
            "Blend weights updated"
        );
        Ok(validated)
    }

    /// Merge `patch` over the current weights, validate, then store.
    pub fn apply(&self, patch: &WeightsPatch) -> RgrResult<Weights> {
        let mut guard = self.current.write();
        let validated = guard.merged(patch).validate()?;
        *guard = validated;
        Ok(validated)
    }

    pub fn reset(&self) -> Weights {
        *self.current.write() = Weights::DEFAULT;
        Weights::DEFAULT
    }
}

impl Default for WeightStore {
    fn default() -> Self {
        Self {
            current: RwLock::new(Weights::DEFAULT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_are_valid() {
        assert!(Weights::DEFAULT.validate().is_ok());
        assert!((Weights::DEFAULT.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sum_outside_tolerance_rejected() {
        let weights = Weights {
            rule: 0.5,
            graph: 0.4,
            rl_exploit: 0.2,
            rl_explore: 0.1,
        };
        assert!((weights.sum() - 1.2).abs() < 1e-9);
        assert!(matches!(weights.validate(), Err(RgrError::InvalidInput(_))));
    }

    #[test]
    fn test_sum_within_tolerance_accepted() {
        let low = Weights {
            rule: 0.42,
            graph: 0.38,
            rl_exploit: 0.149,
            rl_explore: 0.05,
        };
        let high = Weights {
            rule: 0.42,
            graph: 0.38,
            rl_exploit: 0.155,
            rl_explore: 0.05,
        };
        assert!(low.validate().is_ok());
        assert!(high.validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = Weights {
            rule: 1.1,
            graph: -0.1,
            rl_exploit: 0.0,
            rl_explore: 0.0,
        };
        let err = weights.validate().unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_normalized_sums_to_one() {
        let weights = Weights {
            rule: 0.425,
            graph: 0.38,
            rl_exploit: 0.15,
            rl_explore: 0.05,
        };
        let normalized = weights.normalized();
        assert!((normalized.sum() - 1.0).abs() < 1e-12);
        assert!(normalized.rule < weights.rule);
    }

    #[test]
    fn test_normalized_zero_sum_is_zero() {
        let zero = Weights {
            rule: 0.0,
            graph: 0.0,
            rl_exploit: 0.0,
            rl_explore: 0.0,
        };
        assert_eq!(zero.normalized().sum(), 0.0);
    }

    #[test]
    fn test_store_rejects_invalid_and_keeps_current() {
        let store = WeightStore::default();
        let bad = Weights {
            rule: 0.9,
            ..Weights::DEFAULT
        };
        assert!(store.set(bad).is_err());
        assert_eq!(store.get(), Weights::DEFAULT);
    }

    #[test]
    fn test_store_apply_patch() {
        let store = WeightStore::default();
        let patch = WeightsPatch {
            rule: Some(0.32),
            graph: Some(0.48),
            ..Default::default()
        };
        let updated = store.apply(&patch).unwrap();
        assert_eq!(updated.rule, 0.32);
        assert_eq!(updated.graph, 0.48);
        assert_eq!(updated.rl_exploit, Weights::DEFAULT.rl_exploit);
        assert_eq!(store.get(), updated);

        let rejected = WeightsPatch {
            rule: Some(0.6),
            ..Default::default()
        };
        assert!(store.apply(&rejected).is_err());
        assert_eq!(store.get(), updated);

        assert_eq!(store.reset(), Weights::DEFAULT);
    }
}
