//! Q-table: learned scalar preference per (customer, item), updated by
//! explicit feedback and read by every recommendation request.
//!
//! The update is a single-step exponential moving average toward the
//! feedback reward, `q ← q + α·(r − q)`. There is no next-state term.

use dashmap::DashMap;
use rgr_core::config::ScoringConfig;
use rgr_core::types::{CustomerItemKey, FeedbackKind, QValueRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QTableParams {
    pub learning_rate: f64,
    pub reward_purchase: f64,
    pub reward_like: f64,
    pub reward_dislike: f64,
    pub logistic_slope: f64,
    pub exploration_bonus: f64,
}

impl QTableParams {
    pub fn reward(&self, kind: FeedbackKind) -> f64 {
        match kind {
            FeedbackKind::Purchase => self.reward_purchase,
            FeedbackKind::Like => self.reward_like,
            FeedbackKind::Dislike => self.reward_dislike,
        }
    }
}

impl From<&ScoringConfig> for QTableParams {
    fn from(cfg: &ScoringConfig) -> Self {
        Self {
            learning_rate: cfg.learning_rate,
            reward_purchase: cfg.reward_purchase,
            reward_like: cfg.reward_like,
            reward_dislike: cfg.reward_dislike,
            logistic_slope: cfg.logistic_slope,
            exploration_bonus: cfg.exploration_bonus,
        }
    }
}

impl Default for QTableParams {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

/// Result of one feedback update, read and written under the same key lock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QUpdate {
    pub q_before: f64,
    pub q_after: f64,
}

/// Concurrent Q-table. Absent pairs read as 0.0, the cold-start prior.
///
/// Updates to the same key are serialized by the map's shard lock, which is
/// held across the whole read-modify-write. Different keys proceed
/// independently.
pub struct QTable {
    values: DashMap<CustomerItemKey, f64>,
    params: QTableParams,
}

impl QTable {
    pub fn new(params: QTableParams) -> Self {
        Self {
            values: DashMap::new(),
            params,
        }
    }

    /// Build a table and bulk-load the given seed records.
    pub fn from_records(records: &[QValueRecord], params: QTableParams) -> Self {
        let table = Self::new(params);
        table.initialize(records);
        table
    }

    /// Bulk-load seed records. A later record for the same pair wins.
    pub fn initialize(&self, records: &[QValueRecord]) {
        for record in records {
            self.values.insert(CustomerItemKey::from(record), record.q);
        }
        debug!(records = records.len(), entries = self.values.len(), "Q-table seeded");
    }

    pub fn params(&self) -> &QTableParams {
        &self.params
    }

    pub fn get(&self, customer_id: &str, item_id: &str) -> f64 {
        self.get_key(&CustomerItemKey::new(customer_id, item_id))
    }

    pub fn get_key(&self, key: &CustomerItemKey) -> f64 {
        self.values.get(key).map(|q| *q).unwrap_or(0.0)
    }

    /// Apply one feedback event and return the new value.
    pub fn update(&self, customer_id: &str, item_id: &str, kind: FeedbackKind) -> f64 {
        self.apply_feedback(customer_id, item_id, kind).q_after
    }

    /// Apply one feedback event, reporting the value before and after.
    pub fn apply_feedback(&self, customer_id: &str, item_id: &str, kind: FeedbackKind) -> QUpdate {
        let reward = self.params.reward(kind);
        let alpha = self.params.learning_rate;

        let mut entry = self
            .values
            .entry(CustomerItemKey::new(customer_id, item_id))
            .or_insert(0.0);
        let q_before = *entry;
        let q_after = q_before + alpha * (reward - q_before);
        *entry = q_after;

        QUpdate { q_before, q_after }
    }

    /// Raw Q-value squashed into (0, 1); an untouched pair scores exactly 0.5.
    pub fn exploitation_score(&self, customer_id: &str, item_id: &str) -> f64 {
        logistic(self.get(customer_id, item_id), self.params.logistic_slope)
    }

    /// Fixed bonus for items absent from the caller's notion of "recent".
    pub fn exploration_bonus<S: AsRef<str>>(&self, recent_item_ids: &[S], item_id: &str) -> f64 {
        if recent_item_ids.iter().any(|id| id.as_ref() == item_id) {
            0.0
        } else {
            self.params.exploration_bonus
        }
    }

    /// Flatten the table for persistence, ordered by customer then item.
    pub fn export(&self) -> Vec<QValueRecord> {
        let mut records: Vec<QValueRecord> = self
            .values
            .iter()
            .map(|entry| QValueRecord {
                customer_id: entry.key().customer_id.clone(),
                item_id: entry.key().item_id.clone(),
                q: *entry.value(),
            })
            .collect();
        records.sort_by(|a, b| {
            a.customer_id
                .cmp(&b.customer_id)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for QTable {
    fn default() -> Self {
        Self::new(QTableParams::default())
    }
}

/// 1 / (1 + e^(−slope·q)).
pub fn logistic(q: f64, slope: f64) -> f64 {
    1.0 / (1.0 + (-q * slope).exp())
}
