//! Hybrid recommendation scoring: association rules, two-hop graph
//! co-purchase, and learned Q-values blended into one ranked list.

pub mod aggregate;
pub mod association;
pub mod engine;
pub mod graph;
pub mod normalize;

pub use aggregate::{Aggregator, ScoreBreakdown, ScoringInputs};
pub use association::{AssociationScorer, RuleScore};
pub use engine::{
    CatalogSnapshot, FeedbackOutcome, Recommendation, RecommendationContext,
    RecommendationRequest, RecommendationResponse,
};
pub use graph::{GraphScore, GraphScorer, SamplePath};
