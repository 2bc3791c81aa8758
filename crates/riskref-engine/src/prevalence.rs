//! Per-sector prevalence scoring.
//!
//! Each hazard record contributes a numerator of 1 against its sector's
//! total record count, so every hazard of a sector gets the same level: the
//! score measures the sector's catalog density, not how common the hazard is.

use std::collections::HashMap;

use riskref_core::{FlatHazardRecord, PrevalenceLevel, RiskPrevalence};

const TRES_FREQUENT_RATIO: f64 = 0.8;
const FREQUENT_RATIO: f64 = 0.5;
const OCCASIONNEL_RATIO: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prevalence {
    pub level: PrevalenceLevel,
    pub score: u8,
    pub ratio: f64,
}

/// Map a ratio to its level using the fixed thresholds.
pub fn level_for_ratio(ratio: f64) -> PrevalenceLevel {
    if ratio >= TRES_FREQUENT_RATIO {
        PrevalenceLevel::TresFrequent
    } else if ratio >= FREQUENT_RATIO {
        PrevalenceLevel::Frequent
    } else if ratio >= OCCASIONNEL_RATIO {
        PrevalenceLevel::Occasionnel
    } else {
        PrevalenceLevel::Rare
    }
}

/// Prevalence of one hazard record in a sector holding `total_in_sector` records.
///
/// An empty sector has no records to score; a direct call with zero returns
/// `rare` with score 0.
pub fn sector_prevalence(total_in_sector: usize) -> Prevalence {
    if total_in_sector == 0 {
        return Prevalence {
            level: PrevalenceLevel::Rare,
            score: 0,
            ratio: 0.0,
        };
    }
    let ratio = 1.0 / total_in_sector as f64;
    let level = level_for_ratio(ratio);
    Prevalence {
        level,
        score: level.score(),
        ratio,
    }
}

/// One prevalence row per hazard record, in catalog order.
pub fn compute_prevalences(records: &[FlatHazardRecord]) -> Vec<RiskPrevalence> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *totals.entry(record.sector_code.as_str()).or_default() += 1;
    }

    records
        .iter()
        .map(|record| {
            let total = totals.get(record.sector_code.as_str()).copied().unwrap_or(0);
            let prevalence = sector_prevalence(total);
            RiskPrevalence {
                version: record.version.clone(),
                hazard_id: record.entry.id.clone(),
                sector_code: record.sector_code.clone(),
                level: prevalence.level,
                score: prevalence.score,
                ratio: prevalence.ratio,
            }
        })
        .collect()
}
