//! Catalog flattener: one record per (sector, hazard) in load order.

use indexmap::IndexMap;
use riskref_core::{FlatHazardRecord, HazardSourceDocument};

/// Flatten per-sector hazard lists into a single list tagged with sector code
/// and catalog version.
///
/// Sectors keep their load order and hazards keep their file order. Nothing
/// is deduplicated: hazard ids are sector-local, so the same id in two
/// sectors yields two records.
pub fn flatten_catalog(
    sectors: &IndexMap<String, HazardSourceDocument>,
    version: &str,
) -> Vec<FlatHazardRecord> {
    sectors
        .iter()
        .flat_map(|(code, doc)| {
            doc.hazards.iter().map(move |entry| FlatHazardRecord {
                version: version.to_string(),
                sector_code: code.clone(),
                entry: entry.clone(),
                family_code: None,
                sub_category_code: None,
                is_transversal: false,
            })
        })
        .collect()
}
