//! Source document types for sector hazard catalogs.
//!
//! These mirror the authored JSON files: one base document holding every
//! sector, and an optional generic document holding the hazards shared by all
//! sectors. Field names are camelCase on the wire.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reserved sector code under which the generic document is merged.
pub const GENERIC_SECTOR: &str = "GENERIC";

/// The merged multi-sector catalog as loaded from the document store.
///
/// `sectors` keeps the order in which sectors appear in the base document,
/// with `GENERIC` appended when the generic document introduces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCatalog {
    #[serde(default)]
    pub metadata: CatalogMetadata,
    #[serde(default)]
    pub sectors: IndexMap<String, HazardSourceDocument>,
}

impl SourceCatalog {
    /// Total number of hazard entries across all sectors.
    pub fn hazard_count(&self) -> usize {
        self.sectors.values().map(|doc| doc.hazards.len()).sum()
    }
}

/// Metadata declared at the top of the base document.
///
/// The declared counts are informational only: the loader overwrites them
/// with the actual merged counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata {
    #[serde(default, deserialize_with = "lenient_version")]
    pub version: String,
    #[serde(default)]
    pub date_creation: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub declared_sector_count: usize,
    #[serde(default, deserialize_with = "lenient_count")]
    pub declared_risk_count: usize,
}

/// Numeric versions are kept as their decimal text; anything else non-string is empty.
fn lenient_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(version) => version,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

/// Declared counts are overwritten after loading, so unusable values become 0.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0))
}

/// One sector's hazard catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardSourceDocument {
    #[serde(default)]
    pub sector: SectorDescriptor,
    #[serde(default)]
    pub hazards: Vec<HazardEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorDescriptor {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    /// Official activity classification code (e.g. NAF "41.20A").
    #[serde(default)]
    pub activity_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A hazard as authored in a source document.
///
/// `id` is only unique within its own document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardEntry {
    pub id: String,
    /// Missing titles load as blank; blank titles never count as transversal.
    #[serde(default)]
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub external_tag: Option<String>,
    #[serde(default)]
    pub criticality: Option<Criticality>,
    #[serde(default)]
    pub work_situations: Vec<String>,
    #[serde(default)]
    pub hazards: Vec<String>,
    #[serde(default)]
    pub potential_harms: Vec<String>,
    #[serde(default)]
    pub prevention: PreventionMeasures,
    #[serde(default)]
    pub regulatory_references: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceLink>,
}

impl HazardEntry {
    /// Sub-category label, treating blank labels as absent.
    pub fn sub_category_label(&self) -> Option<&str> {
        self.sub_category
            .as_deref()
            .filter(|label| !label.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criticality {
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreventionMeasures {
    #[serde(default)]
    pub collective: Vec<String>,
    #[serde(default)]
    pub organizational: Vec<String>,
    #[serde(default)]
    pub individual: Vec<String>,
}

/// External resource link: either a bare URL or a labelled link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceLink {
    Url(String),
    Labelled {
        #[serde(default)]
        label: Option<String>,
        url: String,
    },
}

impl ResourceLink {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Labelled { url, .. } => url,
        }
    }
}
