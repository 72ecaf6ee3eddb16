//! Template extraction and pre-validation
//!
//! Resolves requested section identifiers to templates and verifies each has
//! a destination column on the listing document schema. Templates without a
//! destination are classified as skipped before any generation cost is spent.

use super::templates::{SectionTemplate, TemplateRegistry};
use super::SkippedTemplate;
use crate::db::models::section_column_names;
use std::collections::HashSet;

/// Result of resolving a requested section list
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Templates accepted for generation, in request order
    pub valid: Vec<SectionTemplate>,

    /// Requested sections that will not be generated, with reasons
    pub skipped: Vec<SkippedTemplate>,
}

/// Resolves section identifiers against the registry and the document schema
#[derive(Debug, Clone)]
pub struct TemplateExtractor {
    registry: TemplateRegistry,
    columns: HashSet<String>,
}

impl TemplateExtractor {
    /// Create an extractor validating against the listing_documents schema
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            registry,
            columns: section_column_names(),
        }
    }

    /// Create an extractor with an explicit column set (used by tests)
    pub fn with_columns(registry: TemplateRegistry, columns: HashSet<String>) -> Self {
        Self { registry, columns }
    }

    /// Resolve requested section ids into valid and skipped templates.
    ///
    /// Every input id lands in exactly one of the two lists. Duplicate ids
    /// are generated once; later occurrences are skipped.
    pub fn extract(&self, section_ids: &[String]) -> Extraction {
        let mut valid = Vec::new();
        let mut skipped = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for section_id in section_ids {
            if !seen.insert(section_id.as_str()) {
                skipped.push(SkippedTemplate {
                    section_id: section_id.clone(),
                    reason: "duplicate section id".to_string(),
                });
                continue;
            }

            let Some(template) = self.registry.get(section_id) else {
                skipped.push(SkippedTemplate {
                    section_id: section_id.clone(),
                    reason: "unknown template".to_string(),
                });
                continue;
            };

            if !self.columns.contains(&template.column) {
                skipped.push(SkippedTemplate {
                    section_id: section_id.clone(),
                    reason: "no database column".to_string(),
                });
                continue;
            }

            valid.push(template.clone());
        }

        Extraction { valid, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> TemplateRegistry {
        TemplateRegistry::from_templates(vec![
            SectionTemplate::new("sec1prompt", "Section One", "business_description", "p1"),
            SectionTemplate::new("badprompt", "Orphan Section", "column_that_is_gone", "p2"),
            SectionTemplate::new("risk_factors", "Risk Factors", "risk_factors", "p3"),
        ])
    }

    fn test_extractor() -> TemplateExtractor {
        let columns: HashSet<String> = ["business_description", "risk_factors"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        TemplateExtractor::with_columns(test_registry(), columns)
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partition_covers_input_exactly() {
        let extractor = test_extractor();
        let input = ids(&["sec1prompt", "badprompt", "unheard_of", "risk_factors"]);
        let extraction = extractor.extract(&input);

        let mut all: Vec<String> = extraction
            .valid
            .iter()
            .map(|t| t.section_id.clone())
            .chain(extraction.skipped.iter().map(|s| s.section_id.clone()))
            .collect();
        all.sort();
        let mut expected = input.clone();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_missing_column_is_skipped_with_reason() {
        let extractor = test_extractor();
        let extraction = extractor.extract(&ids(&["sec1prompt", "badprompt"]));

        assert_eq!(extraction.valid.len(), 1);
        assert_eq!(extraction.valid[0].section_id, "sec1prompt");
        assert_eq!(
            extraction.skipped,
            vec![SkippedTemplate {
                section_id: "badprompt".to_string(),
                reason: "no database column".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_template_reason() {
        let extractor = test_extractor();
        let extraction = extractor.extract(&ids(&["made_up_section"]));

        assert!(extraction.valid.is_empty());
        assert_eq!(extraction.skipped[0].reason, "unknown template");
    }

    #[test]
    fn test_duplicates_are_generated_once() {
        let extractor = test_extractor();
        let extraction = extractor.extract(&ids(&["sec1prompt", "sec1prompt", "risk_factors"]));

        assert_eq!(extraction.valid.len(), 2);
        assert_eq!(extraction.skipped.len(), 1);
        assert_eq!(extraction.skipped[0].reason, "duplicate section id");
    }

    #[test]
    fn test_request_order_preserved() {
        let extractor = test_extractor();
        let extraction = extractor.extract(&ids(&["risk_factors", "sec1prompt"]));

        let order: Vec<&str> = extraction
            .valid
            .iter()
            .map(|t| t.section_id.as_str())
            .collect();
        assert_eq!(order, vec!["risk_factors", "sec1prompt"]);
    }

    #[test]
    fn test_builtin_extractor_accepts_known_sections() {
        let extractor = TemplateExtractor::new(TemplateRegistry::builtin());
        let extraction = extractor.extract(&ids(&["business_description", "risk_factors"]));
        assert_eq!(extraction.valid.len(), 2);
        assert!(extraction.skipped.is_empty());
    }
}
