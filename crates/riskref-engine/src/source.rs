//! Source loader: reads the base and generic hazard documents and merges them.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use riskref_core::{GENERIC_SECTOR, HazardSourceDocument, SectorDescriptor, SourceCatalog};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::EngineError;

const DEFAULT_BASE_FILE: &str = "sectors.json";
const DEFAULT_GENERIC_FILE: &str = "generic.json";
const GENERIC_SECTOR_NAME: &str = "Risques transversaux";

/// Read-only access to the location holding the source documents.
pub trait DocumentStore {
    /// Where `name` lives, for error reporting.
    fn locate(&self, name: &str) -> PathBuf;

    /// Raw document bytes, or `None` when the document does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, EngineError>;
}

/// Document store rooted at a filesystem directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentStore for FsDocumentStore {
    fn locate(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, EngineError> {
        let path = self.locate(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(EngineError::SourceRead { path, source }),
        }
    }
}

/// File names of the two source documents inside a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNames {
    pub base: String,
    pub generic: String,
}

impl Default for SourceNames {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_FILE.to_string(),
            generic: DEFAULT_GENERIC_FILE.to_string(),
        }
    }
}

/// Load the base document, merge the generic document into it, and
/// recompute the declared counts from the merged contents.
///
/// A missing base document is fatal; a missing generic document is logged
/// and skipped. Malformed JSON in either document is always fatal.
pub fn load_sources(
    store: &impl DocumentStore,
    names: &SourceNames,
) -> Result<SourceCatalog, EngineError> {
    let base_path = store.locate(&names.base);
    let bytes = store
        .read(&names.base)?
        .ok_or_else(|| EngineError::SourceNotFound(base_path.clone()))?;
    let mut catalog: SourceCatalog = parse(&bytes, &base_path)?;

    for (code, doc) in catalog.sectors.iter_mut() {
        if doc.sector.code.trim().is_empty() {
            doc.sector.code = code.clone();
        }
    }
    info!(
        path = %base_path.display(),
        sectors = catalog.sectors.len(),
        hazards = catalog.hazard_count(),
        "loaded base hazard document"
    );

    let generic_path = store.locate(&names.generic);
    match store.read(&names.generic)? {
        Some(bytes) => {
            let generic: HazardSourceDocument = parse(&bytes, &generic_path)?;
            let offered = generic.hazards.len();
            let dropped = merge_generic(&mut catalog, generic);
            info!(
                path = %generic_path.display(),
                merged = offered - dropped,
                dropped,
                "merged generic hazard document"
            );
        }
        None => warn!(
            path = %generic_path.display(),
            "generic hazard document not found, continuing without it"
        ),
    }

    let metadata = &mut catalog.metadata;
    let sector_count = catalog.sectors.len();
    let hazard_count: usize = catalog.sectors.values().map(|doc| doc.hazards.len()).sum();
    if metadata.declared_sector_count != sector_count
        || metadata.declared_risk_count != hazard_count
    {
        debug!(
            declared_sectors = metadata.declared_sector_count,
            declared_hazards = metadata.declared_risk_count,
            sector_count,
            hazard_count,
            "overwriting declared catalog counts"
        );
    }
    metadata.declared_sector_count = sector_count;
    metadata.declared_risk_count = hazard_count;

    Ok(catalog)
}

/// Merge the generic document under the reserved `GENERIC` sector.
///
/// Hazards are unioned by id with the first occurrence kept, whether the
/// earlier copy came from the base document or from the generic document
/// itself. Returns the number of hazards dropped as duplicates.
pub fn merge_generic(catalog: &mut SourceCatalog, generic: HazardSourceDocument) -> usize {
    let HazardSourceDocument { sector, hazards } = generic;
    let target = catalog
        .sectors
        .entry(GENERIC_SECTOR.to_string())
        .or_insert_with(|| HazardSourceDocument {
            sector: generic_descriptor(sector),
            hazards: Vec::new(),
        });

    let mut seen: HashSet<String> = target.hazards.iter().map(|h| h.id.clone()).collect();
    let mut dropped = 0;
    for hazard in hazards {
        if seen.insert(hazard.id.clone()) {
            target.hazards.push(hazard);
        } else {
            debug!(hazard_id = %hazard.id, "dropping duplicate generic hazard");
            dropped += 1;
        }
    }
    dropped
}

fn generic_descriptor(sector: SectorDescriptor) -> SectorDescriptor {
    let name = if sector.name.trim().is_empty() {
        GENERIC_SECTOR_NAME.to_string()
    } else {
        sector.name
    };
    SectorDescriptor {
        code: GENERIC_SECTOR.to_string(),
        name,
        ..sector
    }
}

fn parse<T: DeserializeOwned>(bytes: &[u8], path: &Path) -> Result<T, EngineError> {
    serde_json::from_slice(bytes).map_err(|source| EngineError::SourceParse {
        path: path.to_path_buf(),
        source,
    })
}
