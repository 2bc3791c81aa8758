//! Publisher: replaces a version's derived tables in one unit of work.

use std::collections::BTreeMap;

use riskref_core::{
    CatalogSink, DerivedRows, ReferenceSnapshot, SinkTransaction, SnapshotId,
    TaxonomySubCategory, TableKind,
};
use tracing::info;

use crate::{DerivedCatalog, EngineError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub snapshot_id: SnapshotId,
    pub deleted: usize,
    pub inserted: BTreeMap<TableKind, usize>,
}

/// Upsert the snapshot, drop every derived row it owns, and insert the
/// freshly built sets.
///
/// Runs inside a single sink transaction: any failure returns before
/// `commit`, and dropping the transaction discards the partial writes.
pub fn publish<S: CatalogSink>(
    sink: &mut S,
    snapshot: &ReferenceSnapshot,
    catalog: &DerivedCatalog,
) -> Result<PublishReport, EngineError> {
    let mut tx = sink.begin()?;
    let snapshot_id = tx.upsert_snapshot(snapshot)?;

    let mut deleted = 0;
    for kind in TableKind::ALL {
        deleted += tx.delete_derived_rows(snapshot_id, kind)?;
    }

    let sub_categories: Vec<TaxonomySubCategory> =
        catalog.taxonomy.sub_categories().cloned().collect();
    let batches = [
        DerivedRows::Hazards(&catalog.records),
        DerivedRows::TaxonomyFamilies(catalog.taxonomy.families()),
        DerivedRows::TaxonomySubCategories(&sub_categories),
        DerivedRows::RiskPrevalences(&catalog.prevalences),
        DerivedRows::TransversalRisks(&catalog.transversal_risks),
        DerivedRows::RegulatoryReferences(&catalog.references),
    ];
    let mut inserted = BTreeMap::new();
    for rows in batches {
        let count = tx.insert_many(snapshot_id, rows)?;
        inserted.insert(rows.kind(), count);
    }

    tx.commit()?;
    info!(
        version = %snapshot.version,
        snapshot_id = snapshot_id.0,
        deleted,
        inserted = inserted.values().sum::<usize>(),
        "published reference snapshot"
    );
    Ok(PublishReport {
        snapshot_id,
        deleted,
        inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_catalog;
    use crate::pipeline::new_snapshot;
    use crate::pipeline::tests::{hazard, sample_source};
    use chrono::{TimeZone, Utc};
    use riskref_core::{MemorySink, MemoryTransaction, SinkError};

    fn snapshot_for(source: &riskref_core::SourceCatalog, version: &str) -> ReferenceSnapshot {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        new_snapshot(source, version, None, true, at).unwrap()
    }

    /// Memory sink whose transactions fail when inserting one table.
    struct FailingSink {
        inner: MemorySink,
        fail_on: TableKind,
    }

    struct FailingTransaction<'a> {
        inner: MemoryTransaction<'a>,
        fail_on: TableKind,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("injected failure")]
    struct Injected;

    impl CatalogSink for FailingSink {
        type Transaction<'a>
            = FailingTransaction<'a>
        where
            Self: 'a;

        fn begin(&mut self) -> Result<Self::Transaction<'_>, SinkError> {
            let fail_on = self.fail_on;
            Ok(FailingTransaction {
                inner: self.inner.begin()?,
                fail_on,
            })
        }
    }

    impl SinkTransaction for FailingTransaction<'_> {
        fn upsert_snapshot(&mut self, s: &ReferenceSnapshot) -> Result<SnapshotId, SinkError> {
            self.inner.upsert_snapshot(s)
        }

        fn delete_derived_rows(
            &mut self,
            id: SnapshotId,
            kind: TableKind,
        ) -> Result<usize, SinkError> {
            self.inner.delete_derived_rows(id, kind)
        }

        fn insert_many(
            &mut self,
            id: SnapshotId,
            rows: DerivedRows<'_>,
        ) -> Result<usize, SinkError> {
            if rows.kind() == self.fail_on {
                return Err(SinkError::backend(Injected));
            }
            self.inner.insert_many(id, rows)
        }

        fn commit(self) -> Result<(), SinkError> {
            self.inner.commit()
        }
    }

    #[test]
    fn publishes_every_table() {
        let source = sample_source();
        let catalog = build_catalog(&source, "2026.1").unwrap();
        let mut sink = MemorySink::new();

        let report = publish(&mut sink, &snapshot_for(&source, "2026.1"), &catalog).unwrap();
        assert_eq!(report.deleted, 0);
        assert_eq!(report.inserted[&TableKind::Hazards], 7);
        assert_eq!(report.inserted[&TableKind::TaxonomyFamilies], 6);
        assert_eq!(report.inserted[&TableKind::TransversalRisks], 1);

        let tables = sink.tables(report.snapshot_id).unwrap();
        assert_eq!(tables.hazards, catalog.records);
        assert_eq!(tables.references, catalog.references);
        assert_eq!(tables.prevalences.len(), 7);
    }

    #[test]
    fn republish_is_idempotent() {
        let source = sample_source();
        let catalog = build_catalog(&source, "2026.1").unwrap();
        let mut sink = MemorySink::new();

        let first = publish(&mut sink, &snapshot_for(&source, "2026.1"), &catalog).unwrap();
        let after_first = sink.tables(first.snapshot_id).unwrap().clone();

        let rebuilt = build_catalog(&source, "2026.1").unwrap();
        let second = publish(&mut sink, &snapshot_for(&source, "2026.1"), &rebuilt).unwrap();

        assert_eq!(first.snapshot_id, second.snapshot_id);
        assert_eq!(second.deleted, first.inserted.values().sum::<usize>());
        assert_eq!(sink.tables(second.snapshot_id).unwrap(), &after_first);
        assert_eq!(sink.snapshot_count(), 1);
    }

    #[test]
    fn versions_are_independent() {
        let source = sample_source();
        let mut sink = MemorySink::new();
        let v1 = build_catalog(&source, "2026.1").unwrap();
        publish(&mut sink, &snapshot_for(&source, "2026.1"), &v1).unwrap();

        let mut next = source.clone();
        next.sectors["BTP"]
            .hazards
            .push(hazard("B5", "Ensevelissement", "Chutes", &[]));
        let v2 = build_catalog(&next, "2026.2").unwrap();
        publish(&mut sink, &snapshot_for(&next, "2026.2"), &v2).unwrap();

        let (id1, _) = sink.snapshot("2026.1").unwrap();
        let (id2, _) = sink.snapshot("2026.2").unwrap();
        assert_ne!(id1, id2);
        assert_eq!(sink.tables(id1).unwrap().hazards.len(), 7);
        assert_eq!(sink.tables(id2).unwrap().hazards.len(), 8);
    }

    #[test]
    fn failure_mid_publish_rolls_back() {
        let source = sample_source();
        let catalog = build_catalog(&source, "2026.1").unwrap();
        let mut sink = FailingSink {
            inner: MemorySink::new(),
            fail_on: TableKind::RegulatoryReferences,
        };
        let err = publish(&mut sink, &snapshot_for(&source, "2026.1"), &catalog).unwrap_err();
        assert!(matches!(err, EngineError::Sink(SinkError::Backend(_))));
        assert!(sink.inner.snapshot("2026.1").is_none());

        let mut healthy = MemorySink::new();
        let report = publish(&mut healthy, &snapshot_for(&source, "2026.1"), &catalog).unwrap();
        let before = healthy.tables(report.snapshot_id).unwrap().clone();

        let mut failing = FailingSink {
            inner: healthy,
            fail_on: TableKind::TransversalRisks,
        };
        let mut changed = source.clone();
        changed.sectors["SANTE"].hazards.clear();
        let rebuilt = build_catalog(&changed, "2026.1").unwrap();
        assert!(publish(&mut failing, &snapshot_for(&changed, "2026.1"), &rebuilt).is_err());

        let (id, snap) = failing.inner.snapshot("2026.1").unwrap();
        assert_eq!(id, report.snapshot_id);
        assert_eq!(snap.source_payload, snapshot_for(&source, "2026.1").source_payload);
        assert_eq!(failing.inner.tables(id).unwrap(), &before);
    }
}
