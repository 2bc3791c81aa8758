//! Persistence sink contract for published catalogs.
//!
//! A sink is write-only from the engine's point of view. All writes of one
//! publish run go through a single [`SinkTransaction`]: nothing is visible
//! until [`SinkTransaction::commit`] succeeds, and dropping an uncommitted
//! transaction discards every write made through it.

use std::fmt;

use thiserror::Error;

use crate::records::{
    FlatHazardRecord, RegulatoryReference, RiskPrevalence, TaxonomyFamily, TaxonomySubCategory,
    TransversalRisk,
};

/// Sink-assigned identity of a reference snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(pub i64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six derived tables owned by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKind {
    Hazards,
    TaxonomyFamilies,
    TaxonomySubCategories,
    RiskPrevalences,
    TransversalRisks,
    RegulatoryReferences,
}

impl TableKind {
    pub const ALL: [TableKind; 6] = [
        TableKind::Hazards,
        TableKind::TaxonomyFamilies,
        TableKind::TaxonomySubCategories,
        TableKind::RiskPrevalences,
        TableKind::TransversalRisks,
        TableKind::RegulatoryReferences,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Hazards => "hazards",
            Self::TaxonomyFamilies => "taxonomy_families",
            Self::TaxonomySubCategories => "taxonomy_sub_categories",
            Self::RiskPrevalences => "risk_prevalences",
            Self::TransversalRisks => "transversal_risks",
            Self::RegulatoryReferences => "regulatory_references",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A borrowed batch of rows for one derived table.
#[derive(Debug, Clone, Copy)]
pub enum DerivedRows<'a> {
    Hazards(&'a [FlatHazardRecord]),
    TaxonomyFamilies(&'a [TaxonomyFamily]),
    TaxonomySubCategories(&'a [TaxonomySubCategory]),
    RiskPrevalences(&'a [RiskPrevalence]),
    TransversalRisks(&'a [TransversalRisk]),
    RegulatoryReferences(&'a [RegulatoryReference]),
}

impl DerivedRows<'_> {
    pub fn kind(&self) -> TableKind {
        match self {
            Self::Hazards(_) => TableKind::Hazards,
            Self::TaxonomyFamilies(_) => TableKind::TaxonomyFamilies,
            Self::TaxonomySubCategories(_) => TableKind::TaxonomySubCategories,
            Self::RiskPrevalences(_) => TableKind::RiskPrevalences,
            Self::TransversalRisks(_) => TableKind::TransversalRisks,
            Self::RegulatoryReferences(_) => TableKind::RegulatoryReferences,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Hazards(rows) => rows.len(),
            Self::TaxonomyFamilies(rows) => rows.len(),
            Self::TaxonomySubCategories(rows) => rows.len(),
            Self::RiskPrevalences(rows) => rows.len(),
            Self::TransversalRisks(rows) => rows.len(),
            Self::RegulatoryReferences(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("snapshot {0} does not exist in this unit of work")]
    UnknownSnapshot(SnapshotId),

    #[error("sink backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SinkError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// A persistence target able to open an all-or-nothing unit of work.
pub trait CatalogSink {
    type Transaction<'a>: SinkTransaction
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, SinkError>;
}

/// Writes of one publish run. Dropping without [`commit`](Self::commit) rolls back.
pub trait SinkTransaction {
    /// Create the snapshot, or update the one with the same version in place.
    fn upsert_snapshot(
        &mut self,
        snapshot: &crate::records::ReferenceSnapshot,
    ) -> Result<SnapshotId, SinkError>;

    /// Delete every row of `kind` owned by `snapshot`; returns the number deleted.
    fn delete_derived_rows(
        &mut self,
        snapshot: SnapshotId,
        kind: TableKind,
    ) -> Result<usize, SinkError>;

    /// Insert rows under `snapshot`; returns the number inserted.
    fn insert_many(
        &mut self,
        snapshot: SnapshotId,
        rows: DerivedRows<'_>,
    ) -> Result<usize, SinkError>;

    fn commit(self) -> Result<(), SinkError>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_distinct() {
        let mut names: Vec<&str> = TableKind::ALL.iter().map(|k| k.table_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), TableKind::ALL.len());
    }

    #[test]
    fn derived_rows_report_their_kind() {
        let rows: DerivedRows<'_> = DerivedRows::TransversalRisks(&[]);
        assert_eq!(rows.kind(), TableKind::TransversalRisks);
        assert!(rows.is_empty());
    }
}
