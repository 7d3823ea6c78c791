//! Per-tenant JSON dataset loading and ingest-time validation.

use chrono::{DateTime, Utc};
use rgr_core::error::{RgrError, RgrResult};
use rgr_core::types::{
    AssociationRule, Catalog, Customer, GraphEdge, Item, QValueRecord, Transaction,
};
use rgr_personalization::CatalogSnapshot;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_TENANT: &str = "default";

pub const CUSTOMERS_FILE: &str = "customers.json";
pub const ITEMS_FILE: &str = "items.json";
pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const RULES_FILE: &str = "assoc_rules.json";
pub const EDGES_FILE: &str = "graph_edges.json";
pub const Q_VALUES_FILE: &str = "q_values.json";

/// One tenant's read-only collections plus the Q seed records.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub tenant: String,
    pub catalog: Catalog,
    pub customers: Vec<Customer>,
    pub transactions: Vec<Transaction>,
    pub rules: Vec<AssociationRule>,
    pub edges: Vec<GraphEdge>,
    pub q_values: Vec<QValueRecord>,
    pub loaded_at: DateTime<Utc>,
}

/// Records exactly as read from disk, before validation.
#[derive(Debug, Default)]
pub struct RawDataset {
    pub customers: Vec<Customer>,
    pub items: Vec<Item>,
    pub transactions: Vec<Transaction>,
    pub rules: Vec<AssociationRule>,
    pub edges: Vec<GraphEdge>,
    pub q_values: Vec<QValueRecord>,
}

impl Dataset {
    /// Validate raw records:
    /// - rules with an empty antecedent or consequent are dropped
    /// - repeated (user, item) edges merge into one, weights summed
    /// - repeated customer or item ids keep the first record
    pub fn ingest(tenant: impl Into<String>, raw: RawDataset) -> Self {
        let tenant = tenant.into();

        let mut seen = HashSet::new();
        let customers: Vec<Customer> = raw
            .customers
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();

        let total_rules = raw.rules.len();
        let rules: Vec<AssociationRule> = raw
            .rules
            .into_iter()
            .filter(|rule| {
                let keep = !rule.antecedent.is_empty() && !rule.consequent.is_empty();
                if !keep {
                    warn!(tenant = %tenant, rule_id = %rule.id, "Dropping rule with empty side");
                }
                keep
            })
            .collect();

        let dataset = Self {
            catalog: Catalog::from_items(raw.items),
            customers,
            transactions: raw.transactions,
            rules,
            edges: merge_edges(raw.edges),
            q_values: raw.q_values,
            loaded_at: Utc::now(),
            tenant,
        };

        info!(
            tenant = %dataset.tenant,
            customers = dataset.customers.len(),
            items = dataset.catalog.len(),
            transactions = dataset.transactions.len(),
            rules = dataset.rules.len(),
            rules_dropped = total_rules - dataset.rules.len(),
            edges = dataset.edges.len(),
            q_values = dataset.q_values.len(),
            "Dataset loaded"
        );
        dataset
    }

    pub fn snapshot(&self) -> CatalogSnapshot<'_> {
        CatalogSnapshot {
            catalog: &self.catalog,
            customers: &self.customers,
            transactions: &self.transactions,
            rules: &self.rules,
            edges: &self.edges,
        }
    }
}

/// Collapse repeated (user, item) pairs into their first position, summing
/// the weights.
fn merge_edges(edges: Vec<GraphEdge>) -> Vec<GraphEdge> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut merged: Vec<GraphEdge> = Vec::with_capacity(edges.len());
    for edge in edges {
        let key = (edge.user_id.clone(), edge.item_id.clone());
        match index.get(&key) {
            Some(&i) => merged[i].weight += edge.weight,
            None => {
                index.insert(key, merged.len());
                merged.push(edge);
            }
        }
    }
    merged
}

/// `<data_dir>` for the default tenant, `<data_dir>/tenants/<tenant>` otherwise.
pub fn tenant_dir(data_dir: &Path, tenant: &str) -> PathBuf {
    if tenant == DEFAULT_TENANT {
        data_dir.to_path_buf()
    } else {
        data_dir.join("tenants").join(tenant)
    }
}

/// Tenant ids become path segments, so they are restricted to
/// `[A-Za-z0-9_-]`.
pub fn validate_tenant(tenant: &str) -> RgrResult<()> {
    let valid = !tenant.is_empty()
        && tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RgrError::invalid(format!("invalid tenant id '{tenant}'")))
    }
}

async fn read_records<T: DeserializeOwned>(dir: &Path, file: &str) -> RgrResult<Vec<T>> {
    let path = dir.join(file);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Dataset file missing, using empty collection");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(RgrError::Dataset {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    };
    serde_json::from_str(&content).map_err(|e| RgrError::Dataset {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Read and ingest the six dataset files of one tenant concurrently.
pub async fn load_tenant(data_dir: &Path, tenant: &str) -> RgrResult<Dataset> {
    validate_tenant(tenant)?;
    let dir = tenant_dir(data_dir, tenant);

    let (customers, items, transactions, rules, edges, q_values) = tokio::join!(
        read_records::<Customer>(&dir, CUSTOMERS_FILE),
        read_records::<Item>(&dir, ITEMS_FILE),
        read_records::<Transaction>(&dir, TRANSACTIONS_FILE),
        read_records::<AssociationRule>(&dir, RULES_FILE),
        read_records::<GraphEdge>(&dir, EDGES_FILE),
        read_records::<QValueRecord>(&dir, Q_VALUES_FILE),
    );

    let raw = RawDataset {
        customers: customers?,
        items: items?,
        transactions: transactions?,
        rules: rules?,
        edges: edges?,
        q_values: q_values?,
    };

    metrics::counter!("dataset.loads").increment(1);
    Ok(Dataset::ingest(tenant, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, file: &str, json: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(file), json).unwrap();
    }

    #[test]
    fn test_tenant_dir_layout() {
        let root = Path::new("/data");
        assert_eq!(tenant_dir(root, "default"), PathBuf::from("/data"));
        assert_eq!(tenant_dir(root, "acme"), PathBuf::from("/data/tenants/acme"));
    }

    #[test]
    fn test_validate_tenant() {
        assert!(validate_tenant("acme-eu_1").is_ok());
        for bad in ["", "../etc", "a/b", "a b"] {
            assert!(matches!(validate_tenant(bad), Err(RgrError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = load_tenant(dir.path(), "default").await.unwrap();
        assert!(dataset.catalog.is_empty());
        assert!(dataset.customers.is_empty());
        assert!(dataset.rules.is_empty());
        assert!(dataset.q_values.is_empty());
    }

    #[tokio::test]
    async fn test_loads_tenant_files() {
        let dir = tempfile::tempdir().unwrap();
        let tenant = dir.path().join("tenants").join("acme");
        write(&tenant, CUSTOMERS_FILE, r#"[{"id":"C1","name":"Ada"}]"#);
        write(
            &tenant,
            ITEMS_FILE,
            r#"[{"id":"SKU1","name":"Tea","unitPrice":3.5},{"id":"SKU2","name":"Mug","unitPrice":8.0}]"#,
        );
        write(
            &tenant,
            TRANSACTIONS_FILE,
            r#"[{"id":"T1","customerId":"C1","itemIds":["SKU1"],"timestamp":"2024-02-01T08:00:00Z"}]"#,
        );
        write(
            &tenant,
            RULES_FILE,
            r#"[{"id":"R1","antecedent":["SKU1"],"consequent":["SKU2"],"confidence":0.8,"lift":2.0}]"#,
        );

        let dataset = load_tenant(dir.path(), "acme").await.unwrap();
        assert_eq!(dataset.tenant, "acme");
        assert_eq!(dataset.catalog.len(), 2);
        assert_eq!(dataset.snapshot().history("C1").len(), 1);
        assert_eq!(dataset.rules.len(), 1);
        assert!(dataset.edges.is_empty());
    }

    #[tokio::test]
    async fn test_date_only_transactions_load() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            TRANSACTIONS_FILE,
            r#"[{"id":"T2","customerId":"C1","itemIds":["SKU2"],"date":"2024-01-16"},
                {"id":"T1","customerId":"C1","itemIds":["SKU1"],"date":"2024-01-15T23:00:00Z","total":3}]"#,
        );

        let dataset = load_tenant(dir.path(), "default").await.unwrap();
        let history = dataset.snapshot().history("C1");
        let ids: Vec<&str> = history.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
        assert_eq!(history[1].timestamp.to_rfc3339(), "2024-01-16T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_malformed_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ITEMS_FILE, "{ not json");
        let err = load_tenant(dir.path(), "default").await.unwrap_err();
        match err {
            RgrError::Dataset { file, .. } => assert!(file.ends_with(ITEMS_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ingest_drops_empty_rules_and_merges_edges() {
        let rule = |id: &str, antecedent: &[&str], consequent: &[&str]| AssociationRule {
            id: id.to_string(),
            antecedent: antecedent.iter().map(|s| s.to_string()).collect(),
            consequent: consequent.iter().map(|s| s.to_string()).collect(),
            support: 0.1,
            confidence: 0.5,
            lift: 1.0,
        };
        let edge = |user: &str, item: &str, weight: f64| GraphEdge {
            user_id: user.to_string(),
            item_id: item.to_string(),
            weight,
        };
        let customer = |id: &str, name: &str| Customer {
            id: id.to_string(),
            name: name.to_string(),
            country: None,
            tags: Vec::new(),
        };

        let dataset = Dataset::ingest(
            "default",
            RawDataset {
                customers: vec![customer("C1", "first"), customer("C1", "second")],
                rules: vec![rule("R0", &[], &["B"]), rule("R1", &["A"], &["B"]), rule("R2", &["A"], &[])],
                edges: vec![edge("C1", "A", 1.0), edge("C2", "A", 1.0), edge("C1", "A", 2.0)],
                ..Default::default()
            },
        );

        let rule_ids: Vec<&str> = dataset.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(rule_ids, vec!["R1"]);
        assert_eq!(dataset.edges.len(), 2);
        assert_eq!(dataset.edges[0].weight, 3.0);
        assert_eq!(dataset.customers.len(), 1);
        assert_eq!(dataset.customers[0].name, "first");
    }
}
