//! Mine the derived collections (graph edges, pairwise association rules and
//! a zero Q seed) from a tenant's transactions.

use rgr_core::types::{AssociationRule, GraphEdge, QValueRecord, Transaction};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Upper bound on mined rules kept after sorting by lift.
pub const MAX_DERIVED_RULES: usize = 5000;

/// Collections written next to the raw files by ingest.
#[derive(Debug, Clone, Default)]
pub struct DerivedData {
    pub edges: Vec<GraphEdge>,
    pub rules: Vec<AssociationRule>,
    pub q_values: Vec<QValueRecord>,
}

/// One edge per (customer, item) pair, weighted by how many times the
/// customer bought the item. Every occurrence counts, including repeats
/// inside one transaction.
pub fn build_graph_edges(transactions: &[Transaction]) -> Vec<GraphEdge> {
    let mut counts: HashMap<(&str, &str), f64> = HashMap::new();
    for tx in transactions {
        for item in &tx.item_ids {
            *counts
                .entry((tx.customer_id.as_str(), item.as_str()))
                .or_insert(0.0) += 1.0;
        }
    }

    let mut edges: Vec<GraphEdge> = counts
        .into_iter()
        .map(|((user, item), weight)| GraphEdge {
            user_id: user.to_string(),
            item_id: item.to_string(),
            weight,
        })
        .collect();
    edges.sort_by(|a, b| (&a.user_id, &a.item_id).cmp(&(&b.user_id, &b.item_id)));
    edges
}

/// Single-item A → B rules over every ordered pair of distinct items that
/// share a transaction. Items are counted once per transaction.
///
/// - support = pair count / transaction count
/// - confidence = pair count / count(A)
/// - lift = confidence / (count(B) / transaction count)
///
/// Rules are ordered by lift, highest first, and cut to `max_rules`.
pub fn build_assoc_rules(transactions: &[Transaction], max_rules: usize) -> Vec<AssociationRule> {
    if transactions.is_empty() {
        return Vec::new();
    }
    let tx_count = transactions.len() as f64;

    let mut item_support: HashMap<&str, u64> = HashMap::new();
    let mut pair_support: HashMap<(&str, &str), u64> = HashMap::new();
    for tx in transactions {
        let mut unique: Vec<&str> = tx
            .item_ids
            .iter()
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        unique.sort_unstable();

        for &item in &unique {
            *item_support.entry(item).or_insert(0) += 1;
        }
        for &a in &unique {
            for &b in &unique {
                if a != b {
                    *pair_support.entry((a, b)).or_insert(0) += 1;
                }
            }
        }
    }

    let mut rules: Vec<AssociationRule> = pair_support
        .into_iter()
        .map(|((a, b), count)| {
            let count = count as f64;
            let support_a = item_support[a] as f64;
            let support_b = item_support[b] as f64;
            let confidence = count / support_a;
            AssociationRule {
                id: format!("{a}->{b}"),
                antecedent: vec![a.to_string()],
                consequent: vec![b.to_string()],
                support: count / tx_count,
                confidence,
                lift: confidence / (support_b / tx_count),
            }
        })
        .collect();

    rules.sort_by(|a, b| b.lift.total_cmp(&a.lift).then_with(|| a.id.cmp(&b.id)));
    rules.truncate(max_rules);
    rules
}

/// A zero Q-value for every distinct (customer, item) purchase pair.
pub fn build_q_seed(transactions: &[Transaction]) -> Vec<QValueRecord> {
    let pairs: HashSet<(&str, &str)> = transactions
        .iter()
        .flat_map(|tx| {
            tx.item_ids
                .iter()
                .map(move |item| (tx.customer_id.as_str(), item.as_str()))
        })
        .collect();

    let mut seed: Vec<QValueRecord> = pairs
        .into_iter()
        .map(|(customer, item)| QValueRecord {
            customer_id: customer.to_string(),
            item_id: item.to_string(),
            q: 0.0,
        })
        .collect();
    seed.sort_by(|a, b| (&a.customer_id, &a.item_id).cmp(&(&b.customer_id, &b.item_id)));
    seed
}

pub fn derive(transactions: &[Transaction]) -> DerivedData {
    let derived = DerivedData {
        edges: build_graph_edges(transactions),
        rules: build_assoc_rules(transactions, MAX_DERIVED_RULES),
        q_values: build_q_seed(transactions),
    };
    info!(
        transactions = transactions.len(),
        edges = derived.edges.len(),
        rules = derived.rules.len(),
        q_values = derived.q_values.len(),
        "Derived collections mined"
    );
    metrics::counter!("dataset.derived_rules").increment(derived.rules.len() as u64);
    derived
}
