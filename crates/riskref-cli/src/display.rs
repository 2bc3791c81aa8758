//! Aligned text and JSON rendering for command output.

use std::collections::BTreeMap;
use std::fmt::Write;

use riskref_core::TableKind;
use riskref_engine::{CatalogSummary, PublishReport};
use riskref_store::SnapshotInfo;
use serde_json::{Value, json};

/// Summary of a publish run, one `label value` pair per line.
pub fn render_publish(summary: &CatalogSummary, report: &PublishReport, dry_run: bool) -> String {
    let mut out = String::new();
    let mode = if dry_run { " (dry run)" } else { "" };
    let _ = writeln!(out, "=== Catalog {}{mode} ===", summary.version);
    let _ = writeln!(out);

    let _ = writeln!(out, "Catalog");
    field(&mut out, "sectors", summary.sector_count);
    field(&mut out, "hazards", summary.hazard_count);
    field(&mut out, "families", summary.family_count);
    field(&mut out, "sub_categories", summary.sub_category_count);
    field(&mut out, "transversal_risks", summary.transversal_count);
    field(&mut out, "regulatory_references", summary.reference_count);
    let _ = writeln!(out);

    let _ = writeln!(out, "Snapshot");
    field(&mut out, "snapshot_id", report.snapshot_id);
    field(&mut out, "rows_deleted", report.deleted);
    for (kind, count) in &report.inserted {
        field(&mut out, kind.table_name(), count);
    }
    out
}

/// Machine-readable form of [`render_publish`].
pub fn publish_json(summary: &CatalogSummary, report: &PublishReport, dry_run: bool) -> Value {
    json!({
        "summary": summary,
        "snapshotId": report.snapshot_id.0,
        "deleted": report.deleted,
        "inserted": counts_json(&report.inserted),
        "dryRun": dry_run,
    })
}

/// One stored snapshot with its row counts.
pub fn render_snapshot(info: &SnapshotInfo, counts: &BTreeMap<TableKind, usize>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", info.version);
    if !info.description.is_empty() {
        let _ = writeln!(out, "{}", info.description);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Snapshot");
    field(&mut out, "snapshot_id", info.id);
    field(&mut out, "created_at", &info.created_at);
    field(&mut out, "active", if info.active { "yes" } else { "no" });
    let _ = writeln!(out);

    let _ = writeln!(out, "Row counts");
    for (kind, count) in counts {
        field(&mut out, kind.table_name(), count);
    }
    let _ = writeln!(out);
    out
}

fn counts_json(counts: &BTreeMap<TableKind, usize>) -> Value {
    counts
        .iter()
        .map(|(kind, count)| (kind.table_name().to_string(), json!(count)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn field(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<26} {}", label, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskref_core::SnapshotId;

    fn summary() -> CatalogSummary {
        CatalogSummary {
            version: "2026.1".into(),
            sector_count: 3,
            hazard_count: 7,
            family_count: 6,
            sub_category_count: 0,
            transversal_count: 1,
            reference_count: 5,
        }
    }

    fn report() -> PublishReport {
        PublishReport {
            snapshot_id: SnapshotId(1),
            deleted: 0,
            inserted: BTreeMap::from([(TableKind::Hazards, 7), (TableKind::TransversalRisks, 1)]),
        }
    }

    #[test]
    fn publish_text_is_aligned() {
        let text = render_publish(&summary(), &report(), true);
        assert!(text.starts_with("=== Catalog 2026.1 (dry run) ===\n"));
        assert!(text.contains(&format!("  {:<26} 7\n", "hazards")));
        assert!(text.contains(&format!("  {:<26} 1\n", "transversal_risks")));
    }

    #[test]
    fn publish_json_names_tables() {
        let value = publish_json(&summary(), &report(), false);
        assert_eq!(value["summary"]["hazard_count"], 7);
        assert_eq!(value["inserted"]["hazards"], 7);
        assert_eq!(value["snapshotId"], 1);
        assert_eq!(value["dryRun"], false);
    }

    #[test]
    fn snapshot_card_shows_counts() {
        let info = SnapshotInfo {
            id: SnapshotId(2),
            version: "2026.2".into(),
            created_at: "2026-03-01T08:00:00Z".into(),
            description: String::new(),
            active: false,
        };
        let counts = BTreeMap::from([(TableKind::Hazards, 8)]);
        let text = render_snapshot(&info, &counts);
        assert!(text.starts_with("=== 2026.2 ===\n\n"));
        assert!(text.contains(&format!("  {:<26} no\n", "active")));
        assert!(text.contains(&format!("  {:<26} 8\n", "hazards")));
    }
}
