//! Summary counts and leaderboards for one loaded dataset.

use crate::loader::Dataset;
use rgr_core::types::{AssociationRule, QValueRecord};
use rgr_core::weights::Weights;
use serde::Serialize;

const TOP_K: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub id: String,
    pub antecedent: Vec<String>,
    pub consequent: Vec<String>,
    pub confidence: f64,
    pub lift: f64,
}

impl From<&AssociationRule> for RuleSummary {
    fn from(rule: &AssociationRule) -> Self {
        Self {
            id: rule.id.clone(),
            antecedent: rule.antecedent.clone(),
            consequent: rule.consequent.clone(),
            confidence: rule.confidence,
            lift: rule.lift,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStats {
    pub tenant: String,
    pub customers: usize,
    pub items: usize,
    pub transactions: usize,
    pub rules: usize,
    pub edges: usize,
    pub q_values: usize,
    pub weights: Weights,
    pub top_rules: Vec<RuleSummary>,
    pub top_q_values: Vec<QValueRecord>,
}

impl DatasetStats {
    /// `q_values` is the live table export; the dataset's seed records may
    /// be stale once feedback has been applied.
    pub fn compute(dataset: &Dataset, weights: Weights, q_values: &[QValueRecord]) -> Self {
        let mut rules: Vec<&AssociationRule> = dataset.rules.iter().collect();
        rules.sort_by(|a, b| b.lift.total_cmp(&a.lift));

        let mut top_q: Vec<QValueRecord> = q_values.to_vec();
        top_q.sort_by(|a, b| b.q.total_cmp(&a.q));
        top_q.truncate(TOP_K);

        Self {
            tenant: dataset.tenant.clone(),
            customers: dataset.customers.len(),
            items: dataset.catalog.len(),
            transactions: dataset.transactions.len(),
            rules: dataset.rules.len(),
            edges: dataset.edges.len(),
            q_values: q_values.len(),
            weights,
            top_rules: rules.into_iter().take(TOP_K).map(RuleSummary::from).collect(),
            top_q_values: top_q,
        }
    }
}
