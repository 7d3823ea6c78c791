//! Blend the per-source signals into one score, rank, and assemble the
//! explanation record shown next to each recommendation.

use crate::association::RuleScore;
use crate::graph::{GraphScore, SamplePath};
use rgr_core::config::ScoringConfig;
use rgr_core::types::Catalog;
use rgr_core::weights::Weights;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Price assumed for ranked items missing from the catalog.
const UNKNOWN_ITEM_PRICE: f64 = 999_999.0;

/// Per-item signals fed to [`Aggregator::final_score`]. Absent signals are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringInputs {
    pub rule_score: f64,
    pub graph_score: f64,
    pub exploitation_score: f64,
    pub exploration_bonus: f64,
    #[serde(default)]
    pub lift: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub rule_based: RuleBreakdown,
    pub graph_based: GraphBreakdown,
    pub rl: RlBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBreakdown {
    pub score: f64,
    pub matched_rule_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphBreakdown {
    pub score: f64,
    pub neighbors_considered: usize,
    pub sample_paths: Vec<SamplePath>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RlBreakdown {
    pub exploitation: f64,
    pub exploration_bonus: f64,
    pub q_before: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q_after: Option<f64>,
}

pub struct Aggregator {
    lift_boost: f64,
    tie_epsilon: f64,
    max_sample_paths: usize,
}

impl Aggregator {
    pub fn new(lift_boost: f64, tie_epsilon: f64, max_sample_paths: usize) -> Self {
        Self {
            lift_boost,
            tie_epsilon,
            max_sample_paths,
        }
    }

    /// Weighted sum of the four signals. The weights are re-normalized to
    /// sum to 1 first. A supplied lift multiplies the result by
    /// `1 + lift·lift_boost`.
    pub fn final_score(&self, inputs: &ScoringInputs, weights: &Weights) -> f64 {
        let w = weights.normalized();
        let score = inputs.rule_score * w.rule
            + inputs.graph_score * w.graph
            + inputs.exploitation_score * w.rl_exploit
            + inputs.exploration_bonus * w.rl_explore;

        match inputs.lift {
            Some(lift) if lift != 0.0 => score * (1.0 + lift * self.lift_boost),
            _ => score,
        }
    }

    /// Package already-computed signals for display. Nothing is rescored.
    pub fn build_breakdown(
        &self,
        rule: Option<&RuleScore>,
        graph: Option<&GraphScore>,
        rl: RlBreakdown,
    ) -> ScoreBreakdown {
        ScoreBreakdown {
            rule_based: RuleBreakdown {
                score: rule.map(|r| r.score).unwrap_or(0.0),
                matched_rule_ids: rule.map(|r| r.matched_rule_ids.clone()).unwrap_or_default(),
            },
            graph_based: GraphBreakdown {
                score: graph.map(|g| g.score).unwrap_or(0.0),
                neighbors_considered: graph.map(|g| g.neighbor_count).unwrap_or(0),
                sample_paths: graph
                    .map(|g| {
                        g.sample_paths
                            .iter()
                            .take(self.max_sample_paths)
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            rl,
        }
    }

    /// Rank by `rule_score + graph_score`, highest first, returning the top
    /// `top_n` ids.
    ///
    /// Items scoring within the tie epsilon of the highest score in their
    /// run are ordered by ascending unit price, cheaper first. No two items
    /// of one run differ by the epsilon or more. Items not in the catalog
    /// sort as the most expensive.
    pub fn rank_items(
        &self,
        candidates: &BTreeMap<String, ScoringInputs>,
        catalog: &Catalog,
        top_n: usize,
    ) -> Vec<String> {
        let mut scored: Vec<(&str, f64, f64)> = candidates
            .iter()
            .map(|(item_id, inputs)| {
                let price = catalog
                    .get(item_id)
                    .map(|item| item.unit_price)
                    .unwrap_or(UNKNOWN_ITEM_PRICE);
                (item_id.as_str(), inputs.rule_score + inputs.graph_score, price)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut start = 0;
        while start < scored.len() {
            let mut end = start + 1;
            while end < scored.len() && (scored[start].1 - scored[end].1).abs() < self.tie_epsilon {
                end += 1;
            }
            scored[start..end].sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));
            start = end;
        }

        scored
            .into_iter()
            .take(top_n)
            .map(|(item_id, _, _)| item_id.to_string())
            .collect()
    }
}

impl From<&ScoringConfig> for Aggregator {
    fn from(cfg: &ScoringConfig) -> Self {
        Self::new(cfg.lift_boost, cfg.tie_epsilon, cfg.max_sample_paths)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgr_core::types::Item;

    fn item(id: &str, price: f64) -> Item {
        Item {
            id: id.to_string(),
            sku: id.to_string(),
            name: id.to_string(),
            unit_price: price,
            category: None,
            tags: Vec::new(),
        }
    }

    fn inputs(rule: f64, graph: f64) -> ScoringInputs {
        ScoringInputs {
            rule_score: rule,
            graph_score: graph,
            ..Default::default()
        }
    }

    #[test]
    fn test_final_score_combines_weighted_signals() {
        let agg = Aggregator::default();
        let score = agg.final_score(
            &ScoringInputs {
                rule_score: 0.8,
                graph_score: 0.6,
                exploitation_score: 0.4,
                exploration_bonus: 0.1,
                lift: None,
            },
            &Weights::DEFAULT,
        );
        let expected = 0.8 * 0.42 + 0.6 * 0.38 + 0.4 * 0.15 + 0.1 * 0.05;
        assert!((score - expected).abs() < 1e-12);
        assert!(score > 0.0 && score <= 1.0);
    }

    #[test]
    fn test_missing_signals_default_to_zero() {
        let agg = Aggregator::default();
        let score = agg.final_score(&inputs(0.5, 0.0), &Weights::DEFAULT);
        assert!((score - 0.5 * 0.42).abs() < 1e-12);
        assert_eq!(agg.final_score(&ScoringInputs::default(), &Weights::DEFAULT), 0.0);
    }

    #[test]
    fn test_lift_boosts_score() {
        let agg = Aggregator::default();
        let plain = agg.final_score(&inputs(0.5, 0.0), &Weights::DEFAULT);
        let boosted = agg.final_score(
            &ScoringInputs {
                lift: Some(2.0),
                ..inputs(0.5, 0.0)
            },
            &Weights::DEFAULT,
        );
        assert!(boosted > plain);
        assert!((boosted - plain * 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_drifted_weights_are_renormalized() {
        let agg = Aggregator::default();
        let doubled = Weights {
            rule: 0.84,
            graph: 0.76,
            rl_exploit: 0.30,
            rl_explore: 0.10,
        };
        let a = agg.final_score(&inputs(0.7, 0.3), &Weights::DEFAULT);
        let b = agg.final_score(&inputs(0.7, 0.3), &doubled);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_build_breakdown_packages_inputs() {
        let agg = Aggregator::default();
        let rule = RuleScore {
            score: 0.5,
            matched_rule_ids: vec!["r1".to_string(), "r2".to_string()],
            lift: 1.2,
        };
        let paths: Vec<SamplePath> = (0..5)
            .map(|i| SamplePath {
                via_user_id: format!("u{i}"),
                via_item_id: "i2".to_string(),
            })
            .collect();
        let graph = GraphScore {
            score: 0.3,
            sample_paths: paths,
            neighbor_count: 5,
        };
        let rl = RlBreakdown {
            exploitation: 0.2,
            exploration_bonus: 0.1,
            q_before: 0.05,
            q_after: Some(0.08),
        };

        let breakdown = agg.build_breakdown(Some(&rule), Some(&graph), rl);
        assert_eq!(breakdown.rule_based.score, 0.5);
        assert_eq!(breakdown.rule_based.matched_rule_ids, vec!["r1", "r2"]);
        assert_eq!(breakdown.graph_based.score, 0.3);
        assert_eq!(breakdown.graph_based.neighbors_considered, 5);
        assert_eq!(breakdown.graph_based.sample_paths.len(), 3);
        assert_eq!(breakdown.rl, rl);

        let empty = agg.build_breakdown(None, None, rl);
        assert_eq!(empty.rule_based.score, 0.0);
        assert!(empty.rule_based.matched_rule_ids.is_empty());
        assert!(empty.graph_based.sample_paths.is_empty());
    }

    #[test]
    fn test_breakdown_omits_missing_q_after() {
        let agg = Aggregator::default();
        let rl = RlBreakdown {
            exploitation: 0.5,
            exploration_bonus: 0.1,
            q_before: 0.0,
            q_after: None,
        };
        let json = serde_json::to_value(agg.build_breakdown(None, None, rl)).unwrap();
        assert!(json["rl"].get("qAfter").is_none());
        assert_eq!(json["rl"]["qBefore"], 0.0);
        assert!(json["ruleBased"]["matchedRuleIds"].is_array());
    }

    #[test]
    fn test_rank_items_breaks_ties_by_price() {
        let agg = Aggregator::default();
        let catalog = Catalog::from_items(vec![
            item("pricey", 30.0),
            item("cheap", 5.0),
            item("top", 50.0),
            item("mid", 10.0),
        ]);
        let mut candidates = BTreeMap::new();
        candidates.insert("pricey".to_string(), inputs(0.5, 0.2));
        candidates.insert("cheap".to_string(), inputs(0.4, 0.3005));
        candidates.insert("top".to_string(), inputs(0.9, 0.0));
        candidates.insert("mid".to_string(), inputs(0.1, 0.1));

        let ranked = agg.rank_items(&candidates, &catalog, 10);
        assert_eq!(ranked, vec!["top", "cheap", "pricey", "mid"]);
        assert_eq!(agg.rank_items(&candidates, &catalog, 2), vec!["top", "cheap"]);
    }

    #[test]
    fn test_rank_items_chained_near_scores_are_not_one_tie() {
        let agg = Aggregator::default();
        let mut items = Vec::new();
        let mut candidates = BTreeMap::new();
        for n in 0..10 {
            let id = format!("i{n}");
            items.push(item(&id, 100.0 - n as f64));
            candidates.insert(id, inputs(0.5 - 0.0006 * n as f64, 0.0));
        }
        let catalog = Catalog::from_items(items);

        let ranked = agg.rank_items(&candidates, &catalog, 10);
        // Each run spans less than the epsilon: (i0,i1) (i2,i3) ... with the
        // cheaper second member first.
        assert_eq!(
            ranked,
            vec!["i1", "i0", "i3", "i2", "i5", "i4", "i7", "i6", "i9", "i8"]
        );
        let position = |id: &str| ranked.iter().position(|r| r == id).unwrap();
        assert!(position("i0") < position("i9"));
    }

    #[test]
    fn test_rank_items_unknown_item_sorts_last_in_tie() {
        let agg = Aggregator::default();
        let catalog = Catalog::from_items(vec![item("known", 100.0)]);
        let mut candidates = BTreeMap::new();
        candidates.insert("ghost".to_string(), inputs(0.5, 0.0));
        candidates.insert("known".to_string(), inputs(0.5, 0.0));
        assert_eq!(agg.rank_items(&candidates, &catalog, 5), vec!["known", "ghost"]);
    }
}
