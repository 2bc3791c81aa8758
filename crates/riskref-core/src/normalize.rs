//! Title normalisation for cross-sector hazard matching.
//!
//! Sector catalogs are authored independently, so the same hazard often
//! appears with different casing or stray whitespace ("Exposition au bruit"
//! vs. "exposition au BRUIT "). Normalised titles are the grouping key for
//! transversal detection.
//!
//! # Rules
//!
//! - Leading and trailing whitespace is removed
//! - Letters are lower-cased (Unicode-aware, so "É" becomes "é")
//! - Inner whitespace and accents are left untouched

/// Normalise a hazard title into its matching key.
///
/// Returns `None` when the title is empty or whitespace only: such hazards
/// cannot be matched to anything.
pub fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}
