//! In-memory sink: stages a copy of the committed state and swaps it in on commit.
//!
//! Used for dry runs and for exercising the publisher without a database.

use std::collections::BTreeMap;

use tracing::debug;

use crate::records::{
    FlatHazardRecord, ReferenceSnapshot, RegulatoryReference, RiskPrevalence, TaxonomyFamily,
    TaxonomySubCategory, TransversalRisk,
};
use crate::sink::{CatalogSink, DerivedRows, SinkError, SinkTransaction, SnapshotId, TableKind};

/// Derived rows owned by one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedTables {
    pub hazards: Vec<FlatHazardRecord>,
    pub families: Vec<TaxonomyFamily>,
    pub sub_categories: Vec<TaxonomySubCategory>,
    pub prevalences: Vec<RiskPrevalence>,
    pub transversal_risks: Vec<TransversalRisk>,
    pub references: Vec<RegulatoryReference>,
}

impl DerivedTables {
    pub fn row_count(&self, kind: TableKind) -> usize {
        match kind {
            TableKind::Hazards => self.hazards.len(),
            TableKind::TaxonomyFamilies => self.families.len(),
            TableKind::TaxonomySubCategories => self.sub_categories.len(),
            TableKind::RiskPrevalences => self.prevalences.len(),
            TableKind::TransversalRisks => self.transversal_risks.len(),
            TableKind::RegulatoryReferences => self.references.len(),
        }
    }

    fn clear(&mut self, kind: TableKind) -> usize {
        let removed = self.row_count(kind);
        match kind {
            TableKind::Hazards => self.hazards.clear(),
            TableKind::TaxonomyFamilies => self.families.clear(),
            TableKind::TaxonomySubCategories => self.sub_categories.clear(),
            TableKind::RiskPrevalences => self.prevalences.clear(),
            TableKind::TransversalRisks => self.transversal_risks.clear(),
            TableKind::RegulatoryReferences => self.references.clear(),
        }
        removed
    }

    fn extend(&mut self, rows: DerivedRows<'_>) -> usize {
        match rows {
            DerivedRows::Hazards(r) => self.hazards.extend_from_slice(r),
            DerivedRows::TaxonomyFamilies(r) => self.families.extend_from_slice(r),
            DerivedRows::TaxonomySubCategories(r) => self.sub_categories.extend_from_slice(r),
            DerivedRows::RiskPrevalences(r) => self.prevalences.extend_from_slice(r),
            DerivedRows::TransversalRisks(r) => self.transversal_risks.extend_from_slice(r),
            DerivedRows::RegulatoryReferences(r) => self.references.extend_from_slice(r),
        }
        rows.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct MemoryState {
    snapshots: BTreeMap<SnapshotId, ReferenceSnapshot>,
    tables: BTreeMap<SnapshotId, DerivedTables>,
}

#[derive(Debug, Default)]
pub struct MemorySink {
    state: MemoryState,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed snapshot for `version`, if any.
    pub fn snapshot(&self, version: &str) -> Option<(SnapshotId, &ReferenceSnapshot)> {
        find_version(&self.state, version).map(|id| (id, &self.state.snapshots[&id]))
    }

    /// Committed derived rows for a snapshot.
    pub fn tables(&self, id: SnapshotId) -> Option<&DerivedTables> {
        self.state.tables.get(&id)
    }

    pub fn snapshot_count(&self) -> usize {
        self.state.snapshots.len()
    }
}

fn find_version(state: &MemoryState, version: &str) -> Option<SnapshotId> {
    state
        .snapshots
        .iter()
        .find(|(_, snap)| snap.version == version)
        .map(|(id, _)| *id)
}

pub struct MemoryTransaction<'a> {
    sink: &'a mut MemorySink,
    staged: MemoryState,
}

impl CatalogSink for MemorySink {
    type Transaction<'a>
        = MemoryTransaction<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, SinkError> {
        let staged = self.state.clone();
        Ok(MemoryTransaction { sink: self, staged })
    }
}

impl MemoryTransaction<'_> {
    fn tables_mut(&mut self, id: SnapshotId) -> Result<&mut DerivedTables, SinkError> {
        if !self.staged.snapshots.contains_key(&id) {
            return Err(SinkError::UnknownSnapshot(id));
        }
        Ok(self.staged.tables.entry(id).or_default())
    }
}

impl SinkTransaction for MemoryTransaction<'_> {
    fn upsert_snapshot(&mut self, snapshot: &ReferenceSnapshot) -> Result<SnapshotId, SinkError> {
        let id = match find_version(&self.staged, &snapshot.version) {
            Some(id) => id,
            None => {
                let next = self
                    .staged
                    .snapshots
                    .keys()
                    .next_back()
                    .map_or(1, |last| last.0 + 1);
                SnapshotId(next)
            }
        };
        self.staged.snapshots.insert(id, snapshot.clone());
        Ok(id)
    }

    fn delete_derived_rows(
        &mut self,
        snapshot: SnapshotId,
        kind: TableKind,
    ) -> Result<usize, SinkError> {
        Ok(self.tables_mut(snapshot)?.clear(kind))
    }

    fn insert_many(
        &mut self,
        snapshot: SnapshotId,
        rows: DerivedRows<'_>,
    ) -> Result<usize, SinkError> {
        Ok(self.tables_mut(snapshot)?.extend(rows))
    }

    fn commit(self) -> Result<(), SinkError> {
        debug!(snapshots = self.staged.snapshots.len(), "committing in-memory unit of work");
        self.sink.state = self.staged;
        Ok(())
    }
}
