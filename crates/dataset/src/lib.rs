//! Tenant datasets: JSON loading, the snapshot cache, mining of derived
//! collections, persistence and summary statistics.

pub mod cache;
pub mod derive;
pub mod loader;
pub mod persist;
pub mod stats;

pub use cache::DatasetCache;
pub use derive::{derive, DerivedData, MAX_DERIVED_RULES};
pub use loader::{load_tenant, tenant_dir, Dataset, RawDataset, DEFAULT_TENANT};
pub use persist::{persist_derived, persist_q_table, write_records};
pub use stats::DatasetStats;
