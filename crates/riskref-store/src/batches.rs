//! Conversion of derived rows into Arrow RecordBatches for the DuckDB appender.
//!
//! Column order follows the schemas in `riskref_core::derived`, which are also
//! used to create the tables.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use riskref_core::{DerivedRows, SnapshotId, derived};

use crate::StoreError;

/// Build the RecordBatch for `rows`, every row owned by `snapshot`.
pub fn to_record_batch(
    snapshot: SnapshotId,
    rows: DerivedRows<'_>,
) -> Result<RecordBatch, StoreError> {
    let schema = Arc::new(derived::schema_for(rows.kind()));
    let ids: ArrayRef = Arc::new(Int64Array::from(vec![snapshot.0; rows.len()]));

    let mut columns: Vec<ArrayRef> = vec![ids];
    match rows {
        DerivedRows::Hazards(r) => {
            let payloads = r
                .iter()
                .map(|h| serde_json::to_string(&h.entry))
                .collect::<Result<Vec<_>, _>>()?;
            columns.extend([
                utf8(r.iter().map(|h| h.version.as_str())),
                utf8(r.iter().map(|h| h.sector_code.as_str())),
                utf8(r.iter().map(|h| h.entry.id.as_str())),
                utf8(r.iter().map(|h| h.entry.title.as_str())),
                utf8(r.iter().map(|h| h.entry.category.as_str())),
                opt_utf8(r.iter().map(|h| h.entry.sub_category.as_deref())),
                opt_utf8(r.iter().map(|h| h.family_code.as_deref())),
                opt_utf8(r.iter().map(|h| h.sub_category_code.as_deref())),
                opt_utf8(r.iter().map(|h| h.entry.external_tag.as_deref())),
                Arc::new(Float64Array::from(
                    r.iter()
                        .map(|h| h.entry.criticality.as_ref().and_then(|c| c.score))
                        .collect::<Vec<_>>(),
                )),
                opt_utf8(r.iter().map(|h| {
                    h.entry
                        .criticality
                        .as_ref()
                        .and_then(|c| c.level.as_deref())
                })),
                Arc::new(BooleanArray::from(
                    r.iter().map(|h| h.is_transversal).collect::<Vec<_>>(),
                )),
                utf8(payloads.iter().map(String::as_str)),
            ]);
        }
        DerivedRows::TaxonomyFamilies(r) => {
            columns.extend([
                utf8(r.iter().map(|f| f.code.as_str())),
                utf8(r.iter().map(|f| f.name.as_str())),
                int32(r.iter().map(|f| f.position as i32)),
            ]);
        }
        DerivedRows::TaxonomySubCategories(r) => {
            columns.extend([
                utf8(r.iter().map(|s| s.family_code.as_str())),
                utf8(r.iter().map(|s| s.code.as_str())),
                utf8(r.iter().map(|s| s.name.as_str())),
                int32(r.iter().map(|s| s.position as i32)),
            ]);
        }
        DerivedRows::RiskPrevalences(r) => {
            columns.extend([
                utf8(r.iter().map(|p| p.version.as_str())),
                utf8(r.iter().map(|p| p.hazard_id.as_str())),
                utf8(r.iter().map(|p| p.sector_code.as_str())),
                utf8(r.iter().map(|p| p.level.as_str())),
                int32(r.iter().map(|p| i32::from(p.score))),
                Arc::new(Float64Array::from(
                    r.iter().map(|p| p.ratio).collect::<Vec<_>>(),
                )),
            ]);
        }
        DerivedRows::TransversalRisks(r) => {
            let sectors = r
                .iter()
                .map(|t| serde_json::to_string(&t.sectors_applicable))
                .collect::<Result<Vec<_>, _>>()?;
            columns.extend([
                utf8(r.iter().map(|t| t.version.as_str())),
                utf8(r.iter().map(|t| t.normalized_title.as_str())),
                utf8(r.iter().map(|t| t.hazard_id.as_str())),
                utf8(r.iter().map(|t| t.title.as_str())),
                utf8(r.iter().map(|t| t.category.as_str())),
                utf8(sectors.iter().map(String::as_str)),
                Arc::new(Int64Array::from(
                    r.iter().map(|t| t.occurrences as i64).collect::<Vec<_>>(),
                )),
                utf8(r.iter().map(|t| t.level.as_str())),
            ]);
        }
        DerivedRows::RegulatoryReferences(r) => {
            columns.extend([
                utf8(r.iter().map(|x| x.version.as_str())),
                utf8(r.iter().map(|x| x.raw_text.as_str())),
                utf8(r.iter().map(|x| x.code.as_str())),
                utf8(r.iter().map(|x| x.title.as_str())),
                utf8(r.iter().map(|x| x.kind.as_str())),
            ]);
        }
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn utf8<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from(values.collect::<Vec<_>>()))
}

fn opt_utf8<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(StringArray::from(values.collect::<Vec<_>>()))
}

fn int32(values: impl Iterator<Item = i32>) -> ArrayRef {
    Arc::new(Int32Array::from(values.collect::<Vec<_>>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use riskref_core::{
        Criticality, FlatHazardRecord, HazardEntry, PrevalenceLevel, ReferenceKind,
        RegulatoryReference, TransversalRisk,
    };

    fn hazard(id: &str, score: Option<f64>) -> FlatHazardRecord {
        FlatHazardRecord {
            version: "v1".into(),
            sector_code: "BTP".into(),
            entry: HazardEntry {
                id: id.into(),
                title: "Chute de hauteur".into(),
                category: "Chutes".into(),
                criticality: score.map(|s| Criticality {
                    score: Some(s),
                    level: Some("eleve".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            family_code: Some("FAM01".into()),
            sub_category_code: None,
            is_transversal: true,
        }
    }

    #[test]
    fn hazards_batch_matches_schema() {
        let rows = [hazard("H1", Some(12.0)), hazard("H2", None)];
        let batch = to_record_batch(SnapshotId(7), DerivedRows::Hazards(&rows)).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 14);

        let ids = batch
            .column_by_name("snapshot_id")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(ids.value(1), 7);

        let scores = batch.column_by_name("criticality_score").unwrap();
        assert!(!scores.is_null(0));
        assert!(scores.is_null(1));
        assert!(batch.column_by_name("sub_category_code").unwrap().is_null(0));

        let payload = batch
            .column_by_name("payload")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        let entry: HazardEntry = serde_json::from_str(payload.value(0)).unwrap();
        assert_eq!(entry.id, "H1");
    }

    #[test]
    fn transversal_sectors_encoded_as_json() {
        let rows = [TransversalRisk {
            version: "v1".into(),
            normalized_title: "bruit".into(),
            hazard_id: "B2".into(),
            title: "Bruit".into(),
            category: "Physique".into(),
            sectors_applicable: vec!["BTP".into(), "SANTE".into()],
            occurrences: 2,
            level: PrevalenceLevel::Occasionnel,
        }];
        let batch = to_record_batch(SnapshotId(1), DerivedRows::TransversalRisks(&rows)).unwrap();
        let sectors = batch
            .column_by_name("sectors_applicable")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(sectors.value(0), r#"["BTP","SANTE"]"#);
    }

    #[test]
    fn empty_rows_make_empty_batch() {
        let rows: [RegulatoryReference; 0] = [];
        let batch =
            to_record_batch(SnapshotId(1), DerivedRows::RegulatoryReferences(&rows)).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 6);
    }

    #[test]
    fn reference_kind_stored_as_wire_name() {
        let rows = [RegulatoryReference {
            version: "v1".into(),
            raw_text: "Arrêté du 25 juin 1980".into(),
            code: "REF-1".into(),
            title: "Arrêté du 25 juin 1980".into(),
            kind: ReferenceKind::Arrete,
        }];
        let batch =
            to_record_batch(SnapshotId(1), DerivedRows::RegulatoryReferences(&rows)).unwrap();
        let kinds = batch
            .column_by_name("kind")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(kinds.value(0), "arrete");
    }
}
