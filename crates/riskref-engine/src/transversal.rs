//! Cross-sector hazard detection.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use riskref_core::{FlatHazardRecord, PrevalenceLevel, TransversalRisk, normalize_title};
use tracing::debug;

const MIN_SECTORS: usize = 2;

struct TitleGroup {
    first: usize,
    sectors: BTreeSet<String>,
    occurrences: usize,
}

/// Aggregate level from the number of records sharing a title.
pub fn transversal_level(occurrences: usize) -> PrevalenceLevel {
    match occurrences {
        n if n >= 5 => PrevalenceLevel::TresFrequent,
        n if n >= 3 => PrevalenceLevel::Frequent,
        _ => PrevalenceLevel::Occasionnel,
    }
}

/// Detect titles recurring across sectors and flag the matching records.
///
/// Records are grouped by normalised title; a group spanning at least two
/// distinct sectors becomes a [`TransversalRisk`] carrying the first
/// record's id, title and category. Flagging is a second pass over the whole
/// catalog: every record whose normalised title matches a detected risk is
/// marked, whichever sector it belongs to. Blank titles are never grouped.
pub fn detect_transversal(records: &mut [FlatHazardRecord]) -> Vec<TransversalRisk> {
    let mut groups: IndexMap<String, TitleGroup> = IndexMap::new();
    for (idx, record) in records.iter().enumerate() {
        let Some(key) = normalize_title(&record.entry.title) else {
            debug!(
                sector = %record.sector_code,
                hazard_id = %record.entry.id,
                "blank title excluded from transversal grouping"
            );
            continue;
        };
        let group = groups.entry(key).or_insert_with(|| TitleGroup {
            first: idx,
            sectors: BTreeSet::new(),
            occurrences: 0,
        });
        group.sectors.insert(record.sector_code.clone());
        group.occurrences += 1;
    }

    let risks: Vec<TransversalRisk> = groups
        .into_iter()
        .filter(|(_, group)| group.sectors.len() >= MIN_SECTORS)
        .map(|(normalized_title, group)| {
            let first = &records[group.first];
            TransversalRisk {
                version: first.version.clone(),
                normalized_title,
                hazard_id: first.entry.id.clone(),
                title: first.entry.title.clone(),
                category: first.entry.category.clone(),
                sectors_applicable: group.sectors.into_iter().collect(),
                occurrences: group.occurrences,
                level: transversal_level(group.occurrences),
            }
        })
        .collect();

    let detected: HashSet<&str> = risks.iter().map(|r| r.normalized_title.as_str()).collect();
    for record in records.iter_mut() {
        record.is_transversal = normalize_title(&record.entry.title)
            .is_some_and(|key| detected.contains(key.as_str()));
    }

    risks
}
