//! Regulatory citation extraction and classification.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use riskref_core::{FlatHazardRecord, ReferenceKind, RegulatoryReference};

/// Code du travail article numbers: `R4541-1`, `L4121-1`, `A1234`.
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ARL][0-9]{4,}(?:-[0-9]{1,4})?").expect("citation code pattern is valid")
});

const TITLE_MAX_CHARS: usize = 200;

/// Classify a citation by the first marker it contains.
pub fn classify(raw: &str) -> ReferenceKind {
    if raw.contains("Article") {
        ReferenceKind::CodeTravail
    } else if raw.contains("Arrêté") {
        ReferenceKind::Arrete
    } else {
        ReferenceKind::Recommandation
    }
}

/// Per-run extractor: deduplicates citations by exact text and numbers the
/// ones without a recognisable code as `REF-1`, `REF-2`, ...
#[derive(Debug, Default)]
pub struct ReferenceExtractor {
    seen: IndexSet<String>,
    fallback_seq: usize,
}

impl ReferenceExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a citation. Returns `false` if the exact text was already seen.
    pub fn observe(&mut self, raw: &str) -> bool {
        if self.seen.contains(raw) {
            return false;
        }
        self.seen.insert(raw.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Build one reference per distinct citation, in first-seen order.
    pub fn finish(mut self, version: &str) -> Vec<RegulatoryReference> {
        let seen = std::mem::take(&mut self.seen);
        seen.into_iter()
            .map(|raw| {
                let code = self.code_for(&raw);
                RegulatoryReference {
                    version: version.to_string(),
                    code,
                    title: raw.chars().take(TITLE_MAX_CHARS).collect(),
                    kind: classify(&raw),
                    raw_text: raw,
                }
            })
            .collect()
    }

    fn code_for(&mut self, raw: &str) -> String {
        match CODE_RE.find(raw) {
            Some(m) => m.as_str().to_string(),
            None => {
                self.fallback_seq += 1;
                format!("REF-{}", self.fallback_seq)
            }
        }
    }
}

/// Collect and classify every regulatory citation in the catalog.
pub fn extract_references(
    records: &[FlatHazardRecord],
    version: &str,
) -> Vec<RegulatoryReference> {
    let mut extractor = ReferenceExtractor::new();
    for record in records {
        for raw in &record.entry.regulatory_references {
            extractor.observe(raw);
        }
    }
    extractor.finish(version)
}
