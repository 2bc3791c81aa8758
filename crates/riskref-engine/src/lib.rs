//! Reference catalog consolidation: load, flatten, derive, publish.

mod error;
pub mod flatten;
pub mod pipeline;
pub mod prevalence;
pub mod publish;
pub mod references;
pub mod source;
pub mod taxonomy;
pub mod transversal;

pub use error::EngineError;
pub use flatten::flatten_catalog;
pub use pipeline::{CatalogSummary, DerivedCatalog, build_catalog, new_snapshot, resolve_version};
pub use prevalence::{Prevalence, compute_prevalences, level_for_ratio, sector_prevalence};
pub use publish::{PublishReport, publish};
pub use references::{ReferenceExtractor, extract_references};
pub use source::{DocumentStore, FsDocumentStore, SourceNames, load_sources, merge_generic};
pub use taxonomy::{Taxonomy, TaxonomyBuilder, build_taxonomy};
pub use transversal::{detect_transversal, transversal_level};
