//! Two-level taxonomy derived from the category labels found in the catalog.
//!
//! Families come from distinct primary-category labels, sub-categories from
//! distinct sub-category labels seen under each family. Codes are assigned in
//! first-seen order over the flattened catalog, so both label sets are kept
//! in insertion-ordered collections: the same input always yields the same
//! codes.

use indexmap::{IndexMap, IndexSet};
use riskref_core::{FlatHazardRecord, TaxonomyFamily, TaxonomySubCategory};
use tracing::debug;

/// Accumulates labels in observation order.
#[derive(Debug, Default)]
pub struct TaxonomyBuilder {
    labels: IndexMap<String, IndexSet<String>>,
}

impl TaxonomyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, category: &str, sub_category: Option<&str>) {
        let subs = self.labels.entry(category.to_string()).or_default();
        if let Some(sub) = sub_category {
            subs.insert(sub.to_string());
        }
    }

    /// Assign codes and freeze the taxonomy.
    pub fn build(self) -> Taxonomy {
        let families = self
            .labels
            .iter()
            .enumerate()
            .map(|(fi, (name, subs))| {
                let code = family_code(fi);
                let sub_categories = subs
                    .iter()
                    .enumerate()
                    .map(|(si, sub)| TaxonomySubCategory {
                        family_code: code.clone(),
                        code: sub_category_code(si),
                        name: sub.clone(),
                        position: si as u32 + 1,
                    })
                    .collect();
                TaxonomyFamily {
                    code,
                    name: name.clone(),
                    position: fi as u32 + 1,
                    sub_categories,
                }
            })
            .collect();
        Taxonomy {
            labels: self.labels,
            families,
        }
    }
}

fn family_code(index: usize) -> String {
    format!("FAM{:02}", index + 1)
}

fn sub_category_code(index: usize) -> String {
    format!("SUB{:03}", index + 1)
}

/// Derived taxonomy with code lookup by label.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    labels: IndexMap<String, IndexSet<String>>,
    families: Vec<TaxonomyFamily>,
}

impl Taxonomy {
    pub fn families(&self) -> &[TaxonomyFamily] {
        &self.families
    }

    /// All sub-categories, family by family.
    pub fn sub_categories(&self) -> impl Iterator<Item = &TaxonomySubCategory> {
        self.families.iter().flat_map(|f| f.sub_categories.iter())
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn sub_category_count(&self) -> usize {
        self.families.iter().map(|f| f.sub_categories.len()).sum()
    }

    /// Codes for a `(category, sub-category)` pair, if the category is known.
    pub fn codes_for(
        &self,
        category: &str,
        sub_category: Option<&str>,
    ) -> Option<(&str, Option<&str>)> {
        let (fi, _, subs) = self.labels.get_full(category)?;
        let family = &self.families[fi];
        let sub_code = sub_category
            .and_then(|sub| subs.get_index_of(sub))
            .map(|si| family.sub_categories[si].code.as_str());
        Some((family.code.as_str(), sub_code))
    }

    /// Stamp each record with its family and sub-category codes.
    pub fn assign_codes(&self, records: &mut [FlatHazardRecord]) {
        for record in records.iter_mut() {
            let codes = self.codes_for(&record.entry.category, record.entry.sub_category_label());
            let (family, sub) = match codes {
                Some((family, sub)) => (Some(family.to_string()), sub.map(str::to_string)),
                None => (None, None),
            };
            record.family_code = family;
            record.sub_category_code = sub;
        }
    }
}

/// Build the taxonomy from the flattened catalog, in catalog order.
pub fn build_taxonomy(records: &[FlatHazardRecord]) -> Taxonomy {
    let mut builder = TaxonomyBuilder::new();
    for record in records {
        builder.observe(&record.entry.category, record.entry.sub_category_label());
    }
    let taxonomy = builder.build();
    debug!(
        families = taxonomy.family_count(),
        sub_categories = taxonomy.sub_category_count(),
        "derived taxonomy"
    );
    taxonomy
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskref_core::HazardEntry;

    fn record(sector: &str, category: &str, sub: Option<&str>) -> FlatHazardRecord {
        FlatHazardRecord {
            version: "v1".into(),
            sector_code: sector.into(),
            entry: HazardEntry {
                id: format!("{sector}-{category}"),
                title: category.into(),
                category: category.into(),
                sub_category: sub.map(str::to_string),
                ..Default::default()
            },
            family_code: None,
            sub_category_code: None,
            is_transversal: false,
        }
    }

    fn sample() -> Vec<FlatHazardRecord> {
        vec![
            record("BTP", "Chutes", Some("Hauteur")),
            record("BTP", "Physique", Some("Bruit")),
            record("BTP", "Chutes", Some("Plain-pied")),
            record("SANTE", "Biologique", None),
            record("SANTE", "Physique", Some("Vibrations")),
            record("SANTE", "Chutes", Some("Hauteur")),
        ]
    }

    #[test]
    fn families_in_first_seen_order() {
        let taxonomy = build_taxonomy(&sample());
        let families: Vec<(&str, &str, u32)> = taxonomy
            .families()
            .iter()
            .map(|f| (f.code.as_str(), f.name.as_str(), f.position))
            .collect();
        assert_eq!(
            families,
            vec![
                ("FAM01", "Chutes", 1),
                ("FAM02", "Physique", 2),
                ("FAM03", "Biologique", 3),
            ]
        );
    }

    #[test]
    fn sub_category_codes_are_scoped_per_family() {
        let taxonomy = build_taxonomy(&sample());
        let chutes = &taxonomy.families()[0];
        let physique = &taxonomy.families()[1];
        let biologique = &taxonomy.families()[2];

        let names: Vec<(&str, &str)> = chutes
            .sub_categories
            .iter()
            .map(|s| (s.code.as_str(), s.name.as_str()))
            .collect();
        assert_eq!(names, vec![("SUB001", "Hauteur"), ("SUB002", "Plain-pied")]);

        assert_eq!(physique.sub_categories[0].code, "SUB001");
        assert_eq!(physique.sub_categories[1].name, "Vibrations");
        assert!(physique.sub_categories.iter().all(|s| s.family_code == "FAM02"));

        assert!(biologique.sub_categories.is_empty());
        assert_eq!(taxonomy.sub_category_count(), 4);
    }

    #[test]
    fn assignment_is_deterministic() {
        let first = build_taxonomy(&sample());
        let second = build_taxonomy(&sample());
        assert_eq!(first.families(), second.families());
    }

    #[test]
    fn order_follows_input_not_alphabet() {
        let mut records = sample();
        records.reverse();
        let taxonomy = build_taxonomy(&records);
        assert_eq!(taxonomy.families()[0].name, "Chutes");
        assert_eq!(taxonomy.families()[1].name, "Physique");
        assert_eq!(taxonomy.families()[1].sub_categories[0].name, "Vibrations");
        assert_eq!(taxonomy.families()[2].name, "Biologique");
    }

    #[test]
    fn blank_sub_category_contributes_no_row() {
        let records = vec![record("BTP", "Chutes", Some("  ")), record("BTP", "Chutes", None)];
        let taxonomy = build_taxonomy(&records);
        assert_eq!(taxonomy.family_count(), 1);
        assert_eq!(taxonomy.sub_category_count(), 0);
    }

    #[test]
    fn assigns_codes_to_records() {
        let mut records = sample();
        let taxonomy = build_taxonomy(&records);
        taxonomy.assign_codes(&mut records);

        assert_eq!(records[2].family_code.as_deref(), Some("FAM01"));
        assert_eq!(records[2].sub_category_code.as_deref(), Some("SUB002"));
        assert_eq!(records[3].family_code.as_deref(), Some("FAM03"));
        assert_eq!(records[3].sub_category_code, None);
        assert_eq!(records[4].sub_category_code.as_deref(), Some("SUB002"));
    }

    #[test]
    fn unknown_category_has_no_codes() {
        let taxonomy = build_taxonomy(&sample());
        assert!(taxonomy.codes_for("Chimique", None).is_none());
        assert_eq!(taxonomy.codes_for("Chutes", Some("Inconnue")), Some(("FAM01", None)));
    }
}
