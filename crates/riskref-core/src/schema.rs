/// Arrow schema definitions for the derived catalog tables.
///
/// Every table leads with `snapshot_id`, the owning snapshot. List-valued
/// fields are carried as JSON text so that each table stays flat.
pub mod derived {
    use arrow::datatypes::{DataType, Field, Schema};

    use crate::sink::TableKind;

    /// Schema for a derived table.
    pub fn schema_for(kind: TableKind) -> Schema {
        match kind {
            TableKind::Hazards => hazards_schema(),
            TableKind::TaxonomyFamilies => taxonomy_families_schema(),
            TableKind::TaxonomySubCategories => taxonomy_sub_categories_schema(),
            TableKind::RiskPrevalences => risk_prevalences_schema(),
            TableKind::TransversalRisks => transversal_risks_schema(),
            TableKind::RegulatoryReferences => regulatory_references_schema(),
        }
    }

    /// Flattened hazards. `payload` holds the full authored entry as JSON.
    pub fn hazards_schema() -> Schema {
        Schema::new(vec![
            Field::new("snapshot_id", DataType::Int64, false),
            Field::new("version", DataType::Utf8, false),
            Field::new("sector_code", DataType::Utf8, false),
            Field::new("hazard_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("sub_category", DataType::Utf8, true),
            Field::new("family_code", DataType::Utf8, true),
            Field::new("sub_category_code", DataType::Utf8, true),
            Field::new("external_tag", DataType::Utf8, true),
            Field::new("criticality_score", DataType::Float64, true),
            Field::new("criticality_level", DataType::Utf8, true),
            Field::new("is_transversal", DataType::Boolean, false),
            Field::new("payload", DataType::Utf8, false),
        ])
    }

    pub fn taxonomy_families_schema() -> Schema {
        Schema::new(vec![
            Field::new("snapshot_id", DataType::Int64, false),
            Field::new("code", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("position", DataType::Int32, false),
        ])
    }

    pub fn taxonomy_sub_categories_schema() -> Schema {
        Schema::new(vec![
            Field::new("snapshot_id", DataType::Int64, false),
            Field::new("family_code", DataType::Utf8, false),
            Field::new("code", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("position", DataType::Int32, false),
        ])
    }

    pub fn risk_prevalences_schema() -> Schema {
        Schema::new(vec![
            Field::new("snapshot_id", DataType::Int64, false),
            Field::new("version", DataType::Utf8, false),
            Field::new("hazard_id", DataType::Utf8, false),
            Field::new("sector_code", DataType::Utf8, false),
            Field::new("level", DataType::Utf8, false),
            Field::new("score", DataType::Int32, false),
            Field::new("ratio", DataType::Float64, false),
        ])
    }

    /// `sectors_applicable` is a JSON array of sector codes.
    pub fn transversal_risks_schema() -> Schema {
        Schema::new(vec![
            Field::new("snapshot_id", DataType::Int64, false),
            Field::new("version", DataType::Utf8, false),
            Field::new("normalized_title", DataType::Utf8, false),
            Field::new("hazard_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("sectors_applicable", DataType::Utf8, false),
            Field::new("occurrences", DataType::Int64, false),
            Field::new("level", DataType::Utf8, false),
        ])
    }

    pub fn regulatory_references_schema() -> Schema {
        Schema::new(vec![
            Field::new("snapshot_id", DataType::Int64, false),
            Field::new("version", DataType::Utf8, false),
            Field::new("raw_text", DataType::Utf8, false),
            Field::new("code", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::derived;
    use crate::sink::TableKind;

    #[test]
    fn hazards_schema_has_expected_fields() {
        let schema = derived::hazards_schema();
        assert_eq!(schema.fields().len(), 14);
        assert!(schema.field_with_name("is_transversal").is_ok());
        assert!(schema.field_with_name("payload").is_ok());
    }

    #[test]
    fn every_table_is_keyed_by_snapshot() {
        for kind in TableKind::ALL {
            let schema = derived::schema_for(kind);
            let first = schema.field(0);
            assert_eq!(first.name(), "snapshot_id", "{kind}");
            assert!(!first.is_nullable());
        }
    }
}
