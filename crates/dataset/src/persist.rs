//! Write JSON record files, such as learned Q-values, back into a tenant's
//! dataset directory.

use crate::derive::DerivedData;
use crate::loader::{tenant_dir, validate_tenant, EDGES_FILE, Q_VALUES_FILE, RULES_FILE};
use rgr_core::error::RgrResult;
use rgr_core::types::QValueRecord;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `records` as pretty JSON to `file` in the tenant directory,
/// creating directories as needed. The file is replaced through a rename,
/// so readers never observe a partial write.
pub async fn write_records<T: Serialize>(
    data_dir: &Path,
    tenant: &str,
    file: &str,
    records: &[T],
) -> RgrResult<PathBuf> {
    validate_tenant(tenant)?;
    let dir = tenant_dir(data_dir, tenant);
    tokio::fs::create_dir_all(&dir).await?;

    let path = dir.join(file);
    let staging = dir.join(format!("{file}.tmp"));
    let json = serde_json::to_string_pretty(records)?;
    tokio::fs::write(&staging, json).await?;
    tokio::fs::rename(&staging, &path).await?;
    Ok(path)
}

/// Write the tenant's Q-table export to `q_values.json`.
pub async fn persist_q_table(
    data_dir: &Path,
    tenant: &str,
    records: &[QValueRecord],
) -> RgrResult<PathBuf> {
    let path = write_records(data_dir, tenant, Q_VALUES_FILE, records).await?;
    info!(tenant, records = records.len(), path = %path.display(), "Q-table persisted");
    Ok(path)
}

/// Write mined edges, rules and the Q seed, replacing the tenant's previous
/// derived files.
pub async fn persist_derived(data_dir: &Path, tenant: &str, derived: &DerivedData) -> RgrResult<()> {
    write_records(data_dir, tenant, EDGES_FILE, &derived.edges).await?;
    write_records(data_dir, tenant, RULES_FILE, &derived.rules).await?;
    write_records(data_dir, tenant, Q_VALUES_FILE, &derived.q_values).await?;
    info!(
        tenant,
        edges = derived.edges.len(),
        rules = derived.rules.len(),
        q_values = derived.q_values.len(),
        "Derived collections persisted"
    );
    Ok(())
}
