//! Section template registry
//!
//! Templates ship in code. Each maps a section identifier to a destination
//! column on the listing document record and carries the prompt sent to the
//! completion service.

/// One requested content section: prompt plus destination column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTemplate {
    /// Section identifier as requested by clients
    pub section_id: String,

    /// Human-readable title
    pub title: String,

    /// Destination column on the listing_documents table
    pub column: String,

    /// Prompt text for the completion call
    pub prompt: String,
}

impl SectionTemplate {
    pub fn new(section_id: &str, title: &str, column: &str, prompt: &str) -> Self {
        Self {
            section_id: section_id.to_string(),
            title: title.to_string(),
            column: column.to_string(),
            prompt: prompt.to_string(),
        }
    }
}

/// Lookup table of all known section templates
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<SectionTemplate>,
}

impl TemplateRegistry {
    /// Build a registry from explicit templates (used by tests)
    pub fn from_templates(templates: Vec<SectionTemplate>) -> Self {
        Self { templates }
    }

    /// The built-in listing document templates
    pub fn builtin() -> Self {
        let templates = vec![
            SectionTemplate::new(
                "business_description",
                "Business Description",
                "business_description",
                "Write the business description section of a listing document. \
                Cover the issuer's principal activities, operating history, markets \
                served, and competitive position.",
            ),
            SectionTemplate::new(
                "risk_factors",
                "Risk Factors",
                "risk_factors",
                "Write the risk factors section of a listing document. Identify \
                material risks specific to the issuer's business, industry, and the \
                securities being listed, ordered by materiality.",
            ),
            SectionTemplate::new(
                "use_of_proceeds",
                "Use of Proceeds",
                "use_of_proceeds",
                "Write the use of proceeds section of a listing document. State the \
                intended application of the funds raised and the approximate amounts \
                allocated to each purpose.",
            ),
            SectionTemplate::new(
                "management_discussion",
                "Management Discussion and Analysis",
                "management_discussion",
                "Write the management discussion and analysis section of a listing \
                document. Explain the issuer's financial condition, results of \
                operations, and known trends or uncertainties.",
            ),
            SectionTemplate::new(
                "financial_summary",
                "Financial Summary",
                "financial_summary",
                "Write the financial summary section of a listing document. \
                Summarize revenue, profitability, cash flow, and balance sheet \
                position for the periods covered by the document.",
            ),
            SectionTemplate::new(
                "regulatory_compliance",
                "Regulatory Compliance",
                "regulatory_compliance",
                "Write the regulatory compliance section of a listing document. \
                Describe the licensing, regulatory approvals, and ongoing compliance \
                obligations applicable to the issuer.",
            ),
            SectionTemplate::new(
                "corporate_governance",
                "Corporate Governance",
                "corporate_governance",
                "Write the corporate governance section of a listing document. \
                Describe the board composition, committees, and governance code the \
                issuer follows.",
            ),
            SectionTemplate::new(
                "shareholder_information",
                "Shareholder Information",
                "shareholder_information",
                "Write the shareholder information section of a listing document. \
                Describe the share capital structure, major shareholders, and any \
                lock-up arrangements.",
            ),
        ];

        Self { templates }
    }

    /// Look up a template by section id
    pub fn get(&self, section_id: &str) -> Option<&SectionTemplate> {
        self.templates.iter().find(|t| t.section_id == section_id)
    }

    /// Number of registered templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::section_column_names;

    #[test]
    fn test_builtin_lookup() {
        let registry = TemplateRegistry::builtin();
        let template = registry.get("risk_factors").unwrap();
        assert_eq!(template.column, "risk_factors");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_builtin_columns_exist_in_schema() {
        // Registry drift from the entity schema would silently skip sections.
        let columns = section_column_names();
        let registry = TemplateRegistry::builtin();
        for id in [
            "business_description",
            "risk_factors",
            "use_of_proceeds",
            "management_discussion",
            "financial_summary",
            "regulatory_compliance",
            "corporate_governance",
            "shareholder_information",
        ] {
            let template = registry.get(id).unwrap();
            assert!(
                columns.contains(&template.column),
                "template {} points at missing column {}",
                id,
                template.column
            );
        }
    }
}
