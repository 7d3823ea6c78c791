//! Graph co-purchase scoring: two-hop user → item → user → item traversal
//! over the purchase graph.
//!
//! Only presence of an edge matters; edge weights are not used by the walk.
//! All sets iterate in ascending id order, so the sample paths captured for
//! a candidate are stable across runs.

use crate::association::basket;
use rgr_core::config::ScoringConfig;
use rgr_core::types::{GraphEdge, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One explanation path: the customer shares `via_item_id` with
/// `via_user_id`, who also bought the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePath {
    pub via_user_id: String,
    pub via_item_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphScore {
    /// Path count divided by the best candidate's path count.
    pub score: f64,
    pub sample_paths: Vec<SamplePath>,
    /// Distinct similar users that led to this candidate.
    pub neighbor_count: usize,
}

pub type GraphScores = BTreeMap<String, GraphScore>;

/// item → users and user → items, both built from the edge list.
struct Adjacency<'a> {
    item_users: BTreeMap<&'a str, BTreeSet<&'a str>>,
    user_items: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> Adjacency<'a> {
    fn build(edges: &'a [GraphEdge]) -> Self {
        let mut item_users: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut user_items: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for edge in edges {
            item_users
                .entry(edge.item_id.as_str())
                .or_default()
                .insert(edge.user_id.as_str());
            user_items
                .entry(edge.user_id.as_str())
                .or_default()
                .insert(edge.item_id.as_str());
        }
        Self {
            item_users,
            user_items,
        }
    }
}

#[derive(Default)]
struct Candidate<'a> {
    weight: u64,
    paths: Vec<SamplePath>,
    neighbors: BTreeSet<&'a str>,
}

pub struct GraphScorer {
    max_sample_paths: usize,
}

impl GraphScorer {
    pub fn new(max_sample_paths: usize) -> Self {
        Self { max_sample_paths }
    }

    pub fn score(
        &self,
        customer_id: &str,
        edges: &[GraphEdge],
        history: &[Transaction],
    ) -> GraphScores {
        let own_items = basket(history);
        if own_items.is_empty() || edges.is_empty() {
            return GraphScores::new();
        }

        let adjacency = Adjacency::build(edges);
        let mut candidates: BTreeMap<&str, Candidate> = BTreeMap::new();

        for &via_item in &own_items {
            let Some(similar_users) = adjacency.item_users.get(via_item) else {
                continue;
            };
            for &via_user in similar_users {
                if via_user == customer_id {
                    continue;
                }
                let Some(their_items) = adjacency.user_items.get(via_user) else {
                    continue;
                };
                for &candidate_id in their_items {
                    if own_items.contains(candidate_id) {
                        continue;
                    }
                    let candidate = candidates.entry(candidate_id).or_default();
                    candidate.weight += 1;
                    candidate.neighbors.insert(via_user);
                    if candidate.paths.len() < self.max_sample_paths {
                        candidate.paths.push(SamplePath {
                            via_user_id: via_user.to_string(),
                            via_item_id: via_item.to_string(),
                        });
                    }
                }
            }
        }

        let max_weight = candidates.values().map(|c| c.weight).max().unwrap_or(0).max(1) as f64;

        debug!(
            customer_id,
            own_items = own_items.len(),
            candidates = candidates.len(),
            "Graph scoring complete"
        );

        candidates
            .into_iter()
            .map(|(item_id, candidate)| {
                (
                    item_id.to_string(),
                    GraphScore {
                        score: (candidate.weight as f64 / max_weight).min(1.0),
                        sample_paths: candidate.paths,
                        neighbor_count: candidate.neighbors.len(),
                    },
                )
            })
            .collect()
    }
}

impl From<&ScoringConfig> for GraphScorer {
    fn from(cfg: &ScoringConfig) -> Self {
        Self::new(cfg.max_sample_paths)
    }
}

impl Default for GraphScorer {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

/// Distinct other users sharing at least one item with the customer.
pub fn count_neighbors(customer_id: &str, edges: &[GraphEdge]) -> usize {
    let own: BTreeSet<&str> = edges
        .iter()
        .filter(|e| e.user_id == customer_id)
        .map(|e| e.item_id.as_str())
        .collect();
    edges
        .iter()
        .filter(|e| e.user_id != customer_id && own.contains(e.item_id.as_str()))
        .map(|e| e.user_id.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn edge(user: &str, item: &str) -> GraphEdge {
        GraphEdge {
            user_id: user.to_string(),
            item_id: item.to_string(),
            weight: 1.0,
        }
    }

    fn history(customer: &str, items: &[&str]) -> Vec<Transaction> {
        vec![Transaction {
            id: "tx-1".to_string(),
            customer_id: customer.to_string(),
            item_ids: items.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc::now(),
            total: 0.0,
        }]
    }

    #[test]
    fn test_two_hop_surfaces_neighbor_item() {
        let edges = vec![edge("C1", "I1"), edge("C2", "I1"), edge("C2", "I2")];
        let scores = GraphScorer::default().score("C1", &edges, &history("C1", &["I1"]));

        let i2 = scores.get("I2").expect("I2 should be a candidate");
        assert_eq!(i2.score, 1.0);
        assert_eq!(
            i2.sample_paths,
            vec![SamplePath {
                via_user_id: "C2".to_string(),
                via_item_id: "I1".to_string(),
            }]
        );
        assert_eq!(i2.neighbor_count, 1);
        assert!(!scores.contains_key("I1"));
    }

    #[test]
    fn test_counts_and_normalizes_by_max() {
        // C2 and C3 both share I1 with C1 and both bought I2; only C3 bought I3.
        let edges = vec![
            edge("C1", "I1"),
            edge("C2", "I1"),
            edge("C2", "I2"),
            edge("C3", "I1"),
            edge("C3", "I2"),
            edge("C3", "I3"),
        ];
        let scores = GraphScorer::default().score("C1", &edges, &history("C1", &["I1"]));
        assert_eq!(scores["I2"].score, 1.0);
        assert_eq!(scores["I3"].score, 0.5);
        assert_eq!(scores["I2"].neighbor_count, 2);
    }

    #[test]
    fn test_sample_paths_capped_and_stable() {
        let mut edges = vec![edge("C1", "I1")];
        for user in ["U4", "U2", "U5", "U1", "U3"] {
            edges.push(edge(user, "I1"));
            edges.push(edge(user, "I9"));
        }
        let scorer = GraphScorer::default();
        let first = scorer.score("C1", &edges, &history("C1", &["I1"]));
        edges.reverse();
        let second = scorer.score("C1", &edges, &history("C1", &["I1"]));

        let paths = &first["I9"].sample_paths;
        assert_eq!(paths.len(), 3);
        let via: Vec<&str> = paths.iter().map(|p| p.via_user_id.as_str()).collect();
        assert_eq!(via, vec!["U1", "U2", "U3"]);
        assert_eq!(first, second);
        assert_eq!(first["I9"].neighbor_count, 5);
    }

    #[test]
    fn test_degenerate_inputs_are_empty() {
        let scorer = GraphScorer::default();
        let edges = vec![edge("C1", "I1"), edge("C2", "I1"), edge("C2", "I2")];
        assert!(scorer.score("C1", &edges, &[]).is_empty());
        assert!(scorer.score("C1", &[], &history("C1", &["I1"])).is_empty());
        // Only the customer touched I5: no similar users.
        assert!(scorer
            .score("C1", &[edge("C1", "I5")], &history("C1", &["I5"]))
            .is_empty());
    }

    #[test]
    fn test_count_neighbors() {
        let edges = vec![
            edge("C1", "I1"),
            edge("C1", "I2"),
            edge("C2", "I1"),
            edge("C2", "I2"),
            edge("C3", "I2"),
            edge("C4", "I7"),
        ];
        assert_eq!(count_neighbors("C1", &edges), 2);
        assert_eq!(count_neighbors("C9", &edges), 0);
    }
}
