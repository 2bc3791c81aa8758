//! Derived records produced by one catalog build.
//!
//! Every record is scoped to exactly one catalog version. The store keys them
//! by snapshot id; the `version` field is kept for audit and export.

use serde::{Deserialize, Serialize};

use crate::catalog::HazardEntry;

/// A hazard bound to its owning sector and catalog version.
///
/// `(sector_code, entry.id)` is unique within a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatHazardRecord {
    pub version: String,
    pub sector_code: String,
    pub entry: HazardEntry,
    /// Taxonomy family code resolved from `entry.category`.
    pub family_code: Option<String>,
    /// Sub-category code, scoped to `family_code`.
    pub sub_category_code: Option<String>,
    pub is_transversal: bool,
}

impl FlatHazardRecord {
    pub fn hazard_id(&self) -> &str {
        &self.entry.id
    }

    pub fn title(&self) -> &str {
        &self.entry.title
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyFamily {
    /// `FAM01`, `FAM02`, ... in first-seen order.
    pub code: String,
    pub name: String,
    /// 1-based ordinal position.
    pub position: u32,
    pub sub_categories: Vec<TaxonomySubCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomySubCategory {
    pub family_code: String,
    /// `SUB001`, `SUB002`, ... numbered within the family.
    pub code: String,
    pub name: String,
    /// 1-based ordinal position within the family.
    pub position: u32,
}

/// Discrete prevalence classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrevalenceLevel {
    Rare,
    Occasionnel,
    Frequent,
    TresFrequent,
}

impl PrevalenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rare => "rare",
            Self::Occasionnel => "occasionnel",
            Self::Frequent => "frequent",
            Self::TresFrequent => "tres_frequent",
        }
    }

    /// Numeric score paired with the level (1..=4).
    pub fn score(&self) -> u8 {
        match self {
            Self::Rare => 1,
            Self::Occasionnel => 2,
            Self::Frequent => 3,
            Self::TresFrequent => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrevalence {
    pub version: String,
    pub hazard_id: String,
    pub sector_code: String,
    pub level: PrevalenceLevel,
    pub score: u8,
    pub ratio: f64,
}

/// A hazard title recurring in two or more sectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransversalRisk {
    pub version: String,
    pub normalized_title: String,
    /// Id, title and category of the first occurrence in catalog order.
    pub hazard_id: String,
    pub title: String,
    pub category: String,
    /// Sorted, distinct.
    pub sectors_applicable: Vec<String>,
    pub occurrences: usize,
    pub level: PrevalenceLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    CodeTravail,
    Arrete,
    Recommandation,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeTravail => "code_travail",
            Self::Arrete => "arrete",
            Self::Recommandation => "recommandation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryReference {
    pub version: String,
    /// Citation exactly as authored; the dedup key.
    pub raw_text: String,
    pub code: String,
    pub title: String,
    pub kind: ReferenceKind,
}

/// Version-level envelope for one published catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub version: String,
    /// RFC 3339 timestamp of the publish run.
    pub created_at: String,
    pub description: String,
    /// Full merged source catalog, kept for audit and replay.
    pub source_payload: serde_json::Value,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prevalence_levels_order_by_score() {
        let levels = [
            PrevalenceLevel::Rare,
            PrevalenceLevel::Occasionnel,
            PrevalenceLevel::Frequent,
            PrevalenceLevel::TresFrequent,
        ];
        for pair in levels.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].score() < pair[1].score());
        }
    }

    #[test]
    fn prevalence_level_wire_names() {
        assert_eq!(
            serde_json::to_string(&PrevalenceLevel::TresFrequent).unwrap(),
            "\"tres_frequent\""
        );
        for level in [
            PrevalenceLevel::Rare,
            PrevalenceLevel::Occasionnel,
            PrevalenceLevel::Frequent,
            PrevalenceLevel::TresFrequent,
        ] {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json.trim_matches('"'), level.as_str());
        }
    }

    #[test]
    fn reference_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReferenceKind::CodeTravail).unwrap(),
            "\"code_travail\""
        );
        assert_eq!(ReferenceKind::Arrete.as_str(), "arrete");
        assert_eq!(ReferenceKind::Recommandation.as_str(), "recommandation");
    }
}
