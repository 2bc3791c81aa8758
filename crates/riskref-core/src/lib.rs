pub mod catalog;
pub mod memory;
pub mod normalize;
pub mod records;
pub mod schema;
pub mod sink;

pub use catalog::{
    CatalogMetadata, Criticality, GENERIC_SECTOR, HazardEntry, HazardSourceDocument,
    PreventionMeasures, ResourceLink, SectorDescriptor, SourceCatalog,
};
pub use memory::{DerivedTables, MemorySink, MemoryTransaction};
pub use normalize::normalize_title;
pub use records::{
    FlatHazardRecord, PrevalenceLevel, ReferenceKind, ReferenceSnapshot, RegulatoryReference,
    RiskPrevalence, TaxonomyFamily, TaxonomySubCategory, TransversalRisk,
};
pub use schema::derived;
pub use sink::{CatalogSink, DerivedRows, SinkError, SinkTransaction, SnapshotId, TableKind};
