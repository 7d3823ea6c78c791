//! Reinforcement state for the hybrid recommender: the Q-table of learned
//! (customer, item) preferences and the per-tenant registry that shares one
//! live table across requests.

pub mod q_table;
pub mod registry;

pub use q_table::{QTable, QTableParams, QUpdate};
pub use registry::QTableRegistry;
