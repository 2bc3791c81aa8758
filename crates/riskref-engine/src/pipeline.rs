//! Catalog build: flatten the merged sources and run every derivation.

use chrono::{DateTime, SecondsFormat, Utc};
use riskref_core::{
    FlatHazardRecord, ReferenceSnapshot, RegulatoryReference, RiskPrevalence, SourceCatalog,
    TransversalRisk,
};
use serde::Serialize;
use tracing::info;

use crate::{
    EngineError, Taxonomy, build_taxonomy, compute_prevalences, detect_transversal,
    extract_references, flatten_catalog,
};

/// Everything derived from one catalog version.
#[derive(Debug, Clone)]
pub struct DerivedCatalog {
    pub version: String,
    pub sector_count: usize,
    pub records: Vec<FlatHazardRecord>,
    pub taxonomy: Taxonomy,
    pub prevalences: Vec<RiskPrevalence>,
    pub transversal_risks: Vec<TransversalRisk>,
    pub references: Vec<RegulatoryReference>,
}

/// Counts reported to the operator after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub version: String,
    pub sector_count: usize,
    pub hazard_count: usize,
    pub family_count: usize,
    pub sub_category_count: usize,
    pub transversal_count: usize,
    pub reference_count: usize,
}

impl DerivedCatalog {
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            version: self.version.clone(),
            sector_count: self.sector_count,
            hazard_count: self.records.len(),
            family_count: self.taxonomy.family_count(),
            sub_category_count: self.taxonomy.sub_category_count(),
            transversal_count: self.transversal_risks.len(),
            reference_count: self.references.len(),
        }
    }
}

/// Pick the catalog version: an explicit override wins over the declared one.
pub fn resolve_version(
    source: &SourceCatalog,
    explicit: Option<&str>,
) -> Result<String, EngineError> {
    let version = explicit.unwrap_or(&source.metadata.version).trim();
    if version.is_empty() {
        return Err(EngineError::MissingVersion);
    }
    Ok(version.to_string())
}

/// Run the full derivation for one version.
///
/// All per-run state (taxonomy sequences, citation fallback counter) lives in
/// builders created here, so concurrent or repeated builds never share it.
pub fn build_catalog(source: &SourceCatalog, version: &str) -> Result<DerivedCatalog, EngineError> {
    if version.trim().is_empty() {
        return Err(EngineError::MissingVersion);
    }

    let mut records = flatten_catalog(&source.sectors, version);
    let taxonomy = build_taxonomy(&records);
    taxonomy.assign_codes(&mut records);
    let prevalences = compute_prevalences(&records);
    let transversal_risks = detect_transversal(&mut records);
    let references = extract_references(&records, version);

    let catalog = DerivedCatalog {
        version: version.to_string(),
        sector_count: source.sectors.len(),
        records,
        taxonomy,
        prevalences,
        transversal_risks,
        references,
    };
    let summary = catalog.summary();
    info!(
        version = %summary.version,
        sectors = summary.sector_count,
        hazards = summary.hazard_count,
        families = summary.family_count,
        sub_categories = summary.sub_category_count,
        transversal = summary.transversal_count,
        references = summary.reference_count,
        "built catalog"
    );
    Ok(catalog)
}

/// Snapshot envelope for a build, embedding the merged source for replay.
///
/// Falls back to the declared description when none is given.
pub fn new_snapshot(
    source: &SourceCatalog,
    version: &str,
    description: Option<&str>,
    active: bool,
    created_at: DateTime<Utc>,
) -> Result<ReferenceSnapshot, EngineError> {
    let source_payload = serde_json::to_value(source).map_err(EngineError::Payload)?;
    let description = description
        .or(source.metadata.description.as_deref())
        .unwrap_or_default()
        .to_string();
    Ok(ReferenceSnapshot {
        version: version.to_string(),
        created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        description,
        source_payload,
        active,
    })
}
