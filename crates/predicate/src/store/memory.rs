//! In-memory index store.
//!
//! Holds the current version of each record's index rows per tenant and
//! answers sub-queries by evaluating predicates directly. Used by tests, the
//! explain binary and embedders without a database-backed index.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{BackendError, PredicateResult};
use crate::predicate::Predicate;
use crate::tenant::{SearchContext, TenantId};
use crate::types::{IndexEntry, IndexRow, RecordVersion, SearchParamId};

use super::IndexStore;

/// Records evaluated between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 256;

#[derive(Debug, Default)]
struct TenantIndex {
    /// (resource_type, resource_id) -> current version and its rows.
    records: BTreeMap<(String, String), IndexedRecord>,
}

#[derive(Debug)]
struct IndexedRecord {
    version_id: u32,
    entries: Vec<IndexEntry>,
}

/// Thread-safe in-memory [`IndexStore`].
#[derive(Debug, Default)]
pub struct InMemoryIndexStore {
    tenants: RwLock<HashMap<TenantId, TenantIndex>>,
}

impl InMemoryIndexStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the rows of a record with those of a newer version.
    ///
    /// Rows for versions older than the one already indexed are ignored.
    /// Returns true if the rows were stored.
    pub fn index_record(
        &self,
        tenant: &TenantId,
        record: RecordVersion,
        rows: Vec<(SearchParamId, IndexRow)>,
    ) -> bool {
        let mut tenants = self.tenants.write();
        let index = tenants.entry(tenant.clone()).or_default();
        let key = (record.resource_type.clone(), record.resource_id.clone());

        if let Some(existing) = index.records.get(&key)
            && existing.version_id > record.version_id
        {
            trace!(
                resource_type = %record.resource_type,
                resource_id = %record.resource_id,
                version = record.version_id,
                "Ignoring stale index rows"
            );
            return false;
        }

        let entries = rows
            .into_iter()
            .map(|(param_id, row)| IndexEntry {
                record: record.clone(),
                param_id,
                row,
            })
            .collect();
        index.records.insert(
            key,
            IndexedRecord {
                version_id: record.version_id,
                entries,
            },
        );
        true
    }

    /// Loads a batch of entries, grouping them by record version.
    pub fn load_entries(&self, tenant: &TenantId, entries: Vec<IndexEntry>) -> usize {
        let mut grouped: BTreeMap<RecordVersion, Vec<(SearchParamId, IndexRow)>> = BTreeMap::new();
        for e in entries {
            grouped.entry(e.record).or_default().push((e.param_id, e.row));
        }
        let count = grouped.len();
        for (record, rows) in grouped {
            self.index_record(tenant, record, rows);
        }
        debug!(tenant = %tenant, records = count, "Loaded index entries");
        count
    }

    /// Removes every row of a record. Returns true if it was indexed.
    pub fn remove_record(&self, tenant: &TenantId, resource_type: &str, resource_id: &str) -> bool {
        self.tenants
            .write()
            .get_mut(tenant)
            .map(|index| {
                index
                    .records
                    .remove(&(resource_type.to_string(), resource_id.to_string()))
                    .is_some()
            })
            .unwrap_or(false)
    }

    /// Number of records indexed for a tenant.
    pub fn record_count(&self, tenant: &TenantId) -> usize {
        self.tenants
            .read()
            .get(tenant)
            .map(|index| index.records.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    fn store_name(&self) -> &'static str {
        "memory"
    }

    async fn matching_ids(
        &self,
        ctx: &SearchContext,
        resource_type: &str,
        predicate: &Predicate,
    ) -> PredicateResult<BTreeSet<String>> {
        ctx.check_cancelled()?;
        let tenants = self.tenants.read();
        let Some(index) = tenants.get(ctx.tenant_id()) else {
            return Ok(BTreeSet::new());
        };

        let mut ids = BTreeSet::new();
        for (n, ((rtype, rid), record)) in index.records.iter().enumerate() {
            if n % CANCEL_CHECK_INTERVAL == 0 {
                ctx.check_cancelled()?;
            }
            if rtype == resource_type && predicate.matches(rid, &record.entries) {
                ids.insert(rid.clone());
            }
        }
        trace!(resource_type, matched = ids.len(), "Evaluated sub-query");
        Ok(ids)
    }

    async fn referenced_ids(
        &self,
        ctx: &SearchContext,
        source_type: &str,
        param_id: &SearchParamId,
        sources: &BTreeSet<String>,
        target_type: &str,
    ) -> PredicateResult<BTreeSet<String>> {
        ctx.check_cancelled()?;
        let tenants = self.tenants.read();
        let Some(index) = tenants.get(ctx.tenant_id()) else {
            return Ok(BTreeSet::new());
        };

        let mut targets = BTreeSet::new();
        for source_id in sources {
            let key = (source_type.to_string(), source_id.clone());
            let Some(record) = index.records.get(&key) else {
                continue;
            };
            for entry in record.entries.iter().filter(|e| &e.param_id == param_id) {
                match &entry.row {
                    IndexRow::Reference {
                        base_uri: None,
                        resource_type: Some(rtype),
                        resource_id,
                        ..
                    } if rtype == target_type => {
                        targets.insert(resource_id.clone());
                    }
                    IndexRow::Reference { .. } => {}
                    other => {
                        return Err(BackendError::InvalidIndexData {
                            resource_type: source_type.to_string(),
                            resource_id: source_id.clone(),
                            message: format!(
                                "parameter {} has a {} row where a reference was expected",
                                param_id,
                                other.table()
                            ),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(targets)
    }
}
