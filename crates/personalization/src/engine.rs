//! Recommendation context: the explicitly-passed session state behind
//! every scoring and feedback call.

use crate::aggregate::{Aggregator, RlBreakdown, ScoreBreakdown, ScoringInputs};
use crate::association::AssociationScorer;
use crate::graph::GraphScorer;
use chrono::{DateTime, Utc};
use rgr_core::config::{AppConfig, RequestConfig, ScoringConfig};
use rgr_core::error::{RgrError, RgrResult};
use rgr_core::types::{AssociationRule, Catalog, Customer, FeedbackKind, GraphEdge, Transaction};
use rgr_core::weights::{WeightStore, Weights};
use rgr_rl_engine::QTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Read-only view over one tenant's loaded collections.
#[derive(Debug, Clone, Copy)]
pub struct CatalogSnapshot<'a> {
    pub catalog: &'a Catalog,
    pub customers: &'a [Customer],
    pub transactions: &'a [Transaction],
    pub rules: &'a [AssociationRule],
    pub edges: &'a [GraphEdge],
}

impl<'a> CatalogSnapshot<'a> {
    pub fn customer(&self, customer_id: &str) -> Option<&'a Customer> {
        self.customers.iter().find(|c| c.id == customer_id)
    }

    /// The customer's transactions, oldest first. Equal timestamps keep
    /// their log order.
    pub fn history(&self, customer_id: &str) -> Vec<Transaction> {
        let mut history: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|tx| tx.customer_id == customer_id)
            .cloned()
            .collect();
        history.sort_by_key(|tx| tx.timestamp);
        history
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub customer_id: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_top_n() -> usize {
    10
}

impl RecommendationRequest {
    pub fn new(customer_id: impl Into<String>, top_n: usize) -> Self {
        Self {
            customer_id: customer_id.into(),
            top_n,
            exclude: Vec::new(),
            category: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub item_id: String,
    pub item_name: String,
    pub score: f64,
    pub confidence: f64,
    pub breakdown: ScoreBreakdown,
}

/// Wall-clock milliseconds per scoring stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Timings {
    pub association: f64,
    pub graph: f64,
    pub rl: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub request_id: Uuid,
    pub customer_id: String,
    pub recommendations: Vec<Recommendation>,
    pub weights: Weights,
    pub timings_ms: Timings,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOutcome {
    pub customer_id: String,
    pub item_id: String,
    pub kind: FeedbackKind,
    pub q_before: f64,
    pub q_after: f64,
    /// The pair had never been scored before this event.
    pub is_exploration: bool,
    pub rationale: String,
    pub processed_at: DateTime<Utc>,
}

fn rationale(kind: FeedbackKind, is_exploration: bool) -> &'static str {
    match (kind, is_exploration) {
        (FeedbackKind::Purchase, true) => {
            "Great discovery! Q-value increased significantly for this unexplored item."
        }
        (FeedbackKind::Purchase, false) => "Confirmed preference! Q-value reinforced.",
        (FeedbackKind::Like, _) => "Positive signal recorded. Q-value increased moderately.",
        (FeedbackKind::Dislike, _) => {
            "Negative feedback noted. Q-value decreased to avoid future recommendations."
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000.0
}

/// Session state shared by scoring and feedback: the tenant's Q-table, the
/// blend weights, and the scorer tunables.
pub struct RecommendationContext {
    q_table: Arc<QTable>,
    weights: WeightStore,
    scoring: ScoringConfig,
    max_top_n: usize,
    association: AssociationScorer,
    graph: GraphScorer,
    aggregator: Aggregator,
}

impl RecommendationContext {
    pub fn new(q_table: Arc<QTable>, weights: Weights, scoring: ScoringConfig) -> RgrResult<Self> {
        info!(
            q_entries = q_table.len(),
            rule = weights.rule,
            graph = weights.graph,
            "Recommendation context initialized"
        );
        Ok(Self {
            association: AssociationScorer::from(&scoring),
            graph: GraphScorer::from(&scoring),
            aggregator: Aggregator::from(&scoring),
            weights: WeightStore::new(weights)?,
            q_table,
            scoring,
            max_top_n: RequestConfig::default().max_top_n,
        })
    }

    pub fn from_config(config: &AppConfig, q_table: Arc<QTable>) -> RgrResult<Self> {
        let mut ctx = Self::new(q_table, config.weights, config.scoring.clone())?;
        ctx.max_top_n = config.request.max_top_n;
        Ok(ctx)
    }

    pub fn q_table(&self) -> &Arc<QTable> {
        &self.q_table
    }

    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Score the candidate pool for one customer and return the top
    /// `request.top_n` items, best first.
    pub fn score_recommendations(
        &self,
        request: &RecommendationRequest,
        snapshot: &CatalogSnapshot<'_>,
    ) -> RgrResult<RecommendationResponse> {
        let started = Instant::now();

        if request.top_n == 0 || request.top_n > self.max_top_n {
            return Err(RgrError::invalid(format!(
                "topN must be between 1 and {}, got {}",
                self.max_top_n, request.top_n
            )));
        }
        let customer_id = request.customer_id.as_str();
        if snapshot.customer(customer_id).is_none() {
            return Err(RgrError::not_found(format!("customer '{customer_id}'")));
        }

        info!(customer_id, top_n = request.top_n, "Recommendation request received");

        let history = snapshot.history(customer_id);
        debug!(customer_id, transactions = history.len(), "Customer history loaded");

        let ((assoc_scores, assoc_ms), (graph_scores, graph_ms)) = rayon::join(
            || {
                let t = Instant::now();
                let scores = self.association.score(&history, snapshot.rules);
                (scores, elapsed_ms(t))
            },
            || {
                let t = Instant::now();
                let scores = self.graph.score(customer_id, snapshot.edges, &history);
                (scores, elapsed_ms(t))
            },
        );

        let rl_started = Instant::now();

        let exploration_pool = self
            .scoring
            .exploration_candidates
            .unwrap_or(snapshot.catalog.len());
        let mut candidates: BTreeSet<&str> = BTreeSet::new();
        candidates.extend(assoc_scores.keys().map(String::as_str));
        candidates.extend(graph_scores.keys().map(String::as_str));
        candidates.extend(
            snapshot
                .catalog
                .iter()
                .take(exploration_pool)
                .map(|item| item.id.as_str()),
        );

        let recent_start = history.len().saturating_sub(self.scoring.recent_window);
        let recent_items: Vec<&str> = history[recent_start..]
            .iter()
            .flat_map(|tx| tx.item_ids.iter().map(String::as_str))
            .collect();

        let weights = self.weights.get();
        let mut recommendations = Vec::with_capacity(candidates.len());

        for item_id in candidates {
            let Some(item) = snapshot.catalog.get(item_id) else {
                continue;
            };
            if request.exclude.iter().any(|excluded| excluded == item_id) {
                continue;
            }
            if let (Some(wanted), Some(category)) = (&request.category, &item.category) {
                if wanted != category {
                    continue;
                }
            }

            let rule = assoc_scores.get(item_id);
            let graph = graph_scores.get(item_id);
            let q_before = self.q_table.get(customer_id, item_id);
            let exploitation = self.q_table.exploitation_score(customer_id, item_id);
            let exploration_bonus = self.q_table.exploration_bonus(&recent_items, item_id);

            let inputs = ScoringInputs {
                rule_score: rule.map(|r| r.score).unwrap_or(0.0),
                graph_score: graph.map(|g| g.score).unwrap_or(0.0),
                exploitation_score: exploitation,
                exploration_bonus,
                lift: if self.scoring.boost_by_lift {
                    rule.map(|r| r.lift)
                } else {
                    None
                },
            };
            let score = self.aggregator.final_score(&inputs, &weights);
            let confidence =
                ((inputs.rule_score + inputs.graph_score + exploitation) / 3.0).clamp(0.0, 1.0);
            let breakdown = self.aggregator.build_breakdown(
                rule,
                graph,
                RlBreakdown {
                    exploitation,
                    exploration_bonus,
                    q_before,
                    q_after: None,
                },
            );

            recommendations.push(Recommendation {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                score,
                confidence,
                breakdown,
            });
        }

        let rl_ms = elapsed_ms(rl_started);

        // Stable: equal scores keep ascending item id order.
        recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
        recommendations.truncate(request.top_n);

        let total_ms = elapsed_ms(started);
        metrics::counter!("recommendations.requests").increment(1);
        metrics::histogram!("recommendations.latency_us").record(total_ms * 1_000.0);

        info!(
            customer_id,
            top_n = request.top_n,
            returned = recommendations.len(),
            total_ms,
            "Recommendations generated"
        );

        Ok(RecommendationResponse {
            request_id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            recommendations,
            weights,
            timings_ms: Timings {
                association: assoc_ms,
                graph: graph_ms,
                rl: rl_ms,
                total: total_ms,
            },
            generated_at: Utc::now(),
        })
    }

    /// Apply one explicit feedback event to the Q-table.
    pub fn record_feedback(
        &self,
        snapshot: &CatalogSnapshot<'_>,
        customer_id: &str,
        item_id: &str,
        kind: FeedbackKind,
    ) -> RgrResult<FeedbackOutcome> {
        if snapshot.customer(customer_id).is_none() {
            return Err(RgrError::not_found(format!("customer '{customer_id}'")));
        }
        if !snapshot.catalog.contains(item_id) {
            return Err(RgrError::not_found(format!("item '{item_id}'")));
        }

        let update = self.q_table.apply_feedback(customer_id, item_id, kind);
        let is_exploration = update.q_before == 0.0;

        metrics::counter!("feedback.events", "kind" => kind.as_str()).increment(1);
        info!(
            customer_id,
            item_id,
            kind = kind.as_str(),
            q_before = update.q_before,
            q_after = update.q_after,
            delta = update.q_after - update.q_before,
            "Feedback processed"
        );

        Ok(FeedbackOutcome {
            customer_id: customer_id.to_string(),
            item_id: item_id.to_string(),
            kind,
            q_before: update.q_before,
            q_after: update.q_after,
            is_exploration,
            rationale: rationale(kind, is_exploration).to_string(),
            processed_at: Utc::now(),
        })
    }
}
