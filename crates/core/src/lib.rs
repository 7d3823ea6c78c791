pub mod config;
pub mod error;
pub mod types;
pub mod weights;

pub use config::{AppConfig, ScoringConfig};
pub use error::{RgrError, RgrResult};
pub use types::{Catalog, CustomerItemKey, FeedbackKind};
pub use weights::{WeightStore, Weights, WeightsPatch};
