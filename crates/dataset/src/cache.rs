//! Tenant → loaded dataset snapshots, shared by `Arc`.

use crate::loader::{load_tenant, Dataset};
use dashmap::DashMap;
use rgr_core::error::RgrResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct DatasetCache {
    data_dir: PathBuf,
    datasets: DashMap<String, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            datasets: DashMap::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The cached snapshot for `tenant`, loading it on first use.
    pub async fn get(&self, tenant: &str) -> RgrResult<Arc<Dataset>> {
        if let Some(dataset) = self.datasets.get(tenant) {
            return Ok(Arc::clone(dataset.value()));
        }
        let loaded = Arc::new(load_tenant(&self.data_dir, tenant).await?);
        // Two concurrent first loads race; whichever lands first is kept.
        let entry = self
            .datasets
            .entry(tenant.to_string())
            .or_insert(loaded);
        Ok(Arc::clone(entry.value()))
    }

    /// Reload `tenant` from disk and replace the cached snapshot. Holders of
    /// the previous `Arc` keep reading the old data.
    pub async fn refresh(&self, tenant: &str) -> RgrResult<Arc<Dataset>> {
        let loaded = Arc::new(load_tenant(&self.data_dir, tenant).await?);
        self.datasets.insert(tenant.to_string(), Arc::clone(&loaded));
        info!(tenant, "Dataset cache refreshed");
        Ok(loaded)
    }

    pub fn invalidate(&self, tenant: &str) -> bool {
        self.datasets.remove(tenant).is_some()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
