//! Association-rule scoring: match a customer's basket against mined
//! `antecedent => consequent` rules.

use crate::normalize::min_max;
use rgr_core::config::ScoringConfig;
use rgr_core::types::{AssociationRule, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleScore {
    /// Min-max normalized best composite score across matching rules.
    pub score: f64,
    /// Every rule that recommended the item, in rule order. Not deduplicated.
    pub matched_rule_ids: Vec<String>,
    /// Lift of the rule that produced the best composite score.
    pub lift: f64,
}

/// Candidate item id → rule score, iterated in ascending id order.
pub type AssociationScores = BTreeMap<String, RuleScore>;

/// Union of every item id across a customer's transactions.
pub fn basket(history: &[Transaction]) -> BTreeSet<&str> {
    history
        .iter()
        .flat_map(|tx| tx.item_ids.iter().map(String::as_str))
        .collect()
}

pub struct AssociationScorer {
    confidence_weight: f64,
}

impl AssociationScorer {
    pub fn new(confidence_weight: f64) -> Self {
        Self { confidence_weight }
    }

    /// `w·confidence + (1 - w)·lift`.
    pub fn composite(&self, rule: &AssociationRule) -> f64 {
        self.confidence_weight * rule.confidence + (1.0 - self.confidence_weight) * rule.lift
    }

    /// Score every consequent item of the rules whose antecedent is fully
    /// contained in the customer's basket. Items already purchased are never
    /// candidates. An empty basket or rule set yields an empty map.
    pub fn score(&self, history: &[Transaction], rules: &[AssociationRule]) -> AssociationScores {
        let basket = basket(history);
        if basket.is_empty() {
            return AssociationScores::new();
        }

        let mut scores = AssociationScores::new();
        let mut applicable = 0usize;

        for rule in rules {
            // An empty antecedent would vacuously match every basket.
            if rule.antecedent.is_empty() {
                continue;
            }
            if !rule.antecedent.iter().all(|id| basket.contains(id.as_str())) {
                continue;
            }
            applicable += 1;

            let composite = self.composite(rule);
            for item_id in &rule.consequent {
                if basket.contains(item_id.as_str()) {
                    continue;
                }
                let entry = scores.entry(item_id.clone()).or_insert_with(|| RuleScore {
                    score: composite,
                    matched_rule_ids: Vec::new(),
                    lift: rule.lift,
                });
                if composite > entry.score {
                    entry.score = composite;
                    entry.lift = rule.lift;
                }
                entry.matched_rule_ids.push(rule.id.clone());
            }
        }

        let raw: Vec<f64> = scores.values().map(|s| s.score).collect();
        for (entry, normalized) in scores.values_mut().zip(min_max(&raw)) {
            entry.score = normalized;
        }

        debug!(
            basket = basket.len(),
            applicable_rules = applicable,
            candidates = scores.len(),
            "Association scoring complete"
        );
        scores
    }
}

impl From<&ScoringConfig> for AssociationScorer {
    fn from(cfg: &ScoringConfig) -> Self {
        Self::new(cfg.rule_confidence_weight)
    }
}

impl Default for AssociationScorer {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}
