use crate::weights::Weights;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root application configuration. Loaded from environment variables
/// with the prefix `RGR__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_tenant")]
    pub default_tenant: String,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

/// Tunables of the hybrid scorer. Every constant the scorers use lives here.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Share of confidence in a rule's composite score; lift gets the rest.
    #[serde(default = "default_rule_confidence_weight")]
    pub rule_confidence_weight: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_reward_purchase")]
    pub reward_purchase: f64,
    #[serde(default = "default_reward_like")]
    pub reward_like: f64,
    #[serde(default = "default_reward_dislike")]
    pub reward_dislike: f64,
    /// Slope of the logistic squashing applied to raw Q-values.
    #[serde(default = "default_logistic_slope")]
    pub logistic_slope: f64,
    #[serde(default = "default_exploration_bonus")]
    pub exploration_bonus: f64,
    /// Number of most recent transactions that count as "recent" for the
    /// exploration bonus.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    #[serde(default = "default_lift_boost")]
    pub lift_boost: f64,
    #[serde(default)]
    pub boost_by_lift: bool,
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f64,
    #[serde(default = "default_max_sample_paths")]
    pub max_sample_paths: usize,
    /// Catalog items added to every candidate pool. `None` adds the whole catalog.
    #[serde(default = "default_exploration_candidates")]
    pub exploration_candidates: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,
}

// Default functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_tenant() -> String {
    "default".to_string()
}
fn default_rule_confidence_weight() -> f64 {
    0.5
}
fn default_learning_rate() -> f64 {
    0.1
}
fn default_reward_purchase() -> f64 {
    1.0
}
fn default_reward_like() -> f64 {
    0.4
}
fn default_reward_dislike() -> f64 {
    -0.6
}
fn default_logistic_slope() -> f64 {
    5.0
}
fn default_exploration_bonus() -> f64 {
    0.1
}
fn default_recent_window() -> usize {
    5
}
fn default_lift_boost() -> f64 {
    0.05
}
fn default_tie_epsilon() -> f64 {
    0.001
}
fn default_max_sample_paths() -> usize {
    3
}
fn default_exploration_candidates() -> Option<usize> {
    Some(20)
}
fn default_top_n() -> usize {
    10
}
fn default_max_top_n() -> usize {
    100
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rule_confidence_weight: default_rule_confidence_weight(),
            learning_rate: default_learning_rate(),
            reward_purchase: default_reward_purchase(),
            reward_like: default_reward_like(),
            reward_dislike: default_reward_dislike(),
            logistic_slope: default_logistic_slope(),
            exploration_bonus: default_exploration_bonus(),
            recent_window: default_recent_window(),
            lift_boost: default_lift_boost(),
            boost_by_lift: false,
            tie_epsilon: default_tie_epsilon(),
            max_sample_paths: default_max_sample_paths(),
            exploration_candidates: default_exploration_candidates(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            default_top_n: default_top_n(),
            max_top_n: default_max_top_n(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_tenant: default_tenant(),
            weights: Weights::DEFAULT,
            scoring: ScoringConfig::default(),
            request: RequestConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config
    /// file. Without an explicit path, `rgr.toml` in the working directory is
    /// read if present.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("rgr").required(false),
        };

        let builder = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix("RGR")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
