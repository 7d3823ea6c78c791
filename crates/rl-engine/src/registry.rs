//! One live Q-table per tenant, shared by every request of that tenant.

use crate::q_table::{QTable, QTableParams};
use dashmap::DashMap;
use rgr_core::types::QValueRecord;
use std::sync::Arc;
use tracing::info;

pub struct QTableRegistry {
    tables: DashMap<String, Arc<QTable>>,
    params: QTableParams,
}

impl QTableRegistry {
    pub fn new(params: QTableParams) -> Self {
        Self {
            tables: DashMap::new(),
            params,
        }
    }

    /// Return the tenant's table, seeding it from `seed` on first access.
    ///
    /// `seed` runs at most once per tenant; concurrent first calls for the
    /// same tenant wait on the entry instead of building two tables.
    pub fn get_or_init<F>(&self, tenant_id: &str, seed: F) -> Arc<QTable>
    where
        F: FnOnce() -> Vec<QValueRecord>,
    {
        if let Some(table) = self.tables.get(tenant_id) {
            return Arc::clone(table.value());
        }
        let table = self
            .tables
            .entry(tenant_id.to_string())
            .or_insert_with(|| {
                let records = seed();
                info!(tenant = tenant_id, seeded = records.len(), "Q-table initialized");
                Arc::new(QTable::from_records(&records, self.params))
            });
        Arc::clone(table.value())
    }

    pub fn get(&self, tenant_id: &str) -> Option<Arc<QTable>> {
        self.tables.get(tenant_id).map(|t| Arc::clone(t.value()))
    }

    /// Drop the tenant's live table, e.g. after its dataset was re-ingested.
    /// Requests still holding the old `Arc` keep working on it.
    pub fn evict(&self, tenant_id: &str) -> bool {
        self.tables.remove(tenant_id).is_some()
    }

    pub fn tenants(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl Default for QTableRegistry {
    fn default() -> Self {
        Self::new(QTableParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgr_core::types::FeedbackKind;

    fn seed() -> Vec<QValueRecord> {
        vec![QValueRecord {
            customer_id: "c1".to_string(),
            item_id: "i1".to_string(),
            q: 0.3,
        }]
    }

    #[test]
    fn test_seed_runs_once_per_tenant() {
        let registry = QTableRegistry::default();
        let first = registry.get_or_init("acme", seed);
        first.update("c1", "i1", FeedbackKind::Purchase);

        let second = registry.get_or_init("acme", || panic!("must not reseed"));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.get("c1", "i1") > 0.3);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let registry = QTableRegistry::default();
        let acme = registry.get_or_init("acme", seed);
        let globex = registry.get_or_init("globex", Vec::new);
        acme.update("c1", "i2", FeedbackKind::Like);
        assert_eq!(globex.get("c1", "i2"), 0.0);
        assert_eq!(registry.tenants(), vec!["acme", "globex"]);
    }

    #[test]
    fn test_evict_forces_reseed() {
        let registry = QTableRegistry::default();
        let table = registry.get_or_init("acme", seed);
        table.update("c1", "i1", FeedbackKind::Dislike);

        assert!(registry.evict("acme"));
        assert!(registry.get("acme").is_none());
        let fresh = registry.get_or_init("acme", seed);
        assert_eq!(fresh.get("c1", "i1"), 0.3);
    }
}
