//! Persistence of generated sections
//!
//! Writes all generated content into the listing's document record through a
//! single atomic store call, so a failed save never reports partial columns.

use super::templates::SectionTemplate;
use super::{DocumentStore, GeneratedSection};
use std::sync::Arc;
use uuid::Uuid;

/// Result of the save step
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub success: bool,

    /// Destination columns written; empty unless success
    pub columns_updated: Vec<String>,

    pub error: Option<String>,
}

/// Persists generated sections into their destination columns
pub struct OutputHandler {
    store: Arc<dyn DocumentStore>,
}

impl OutputHandler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Save generated sections, pairing each with its template's column.
    ///
    /// Sections without a matching template are impossible by construction
    /// (the orchestrator only generates from valid templates), so a mismatch
    /// here is reported as a failure rather than silently dropped.
    pub async fn save(
        &self,
        listing_id: Uuid,
        document_type: &str,
        templates: &[SectionTemplate],
        sections: &[GeneratedSection],
    ) -> SaveOutcome {
        let mut entries: Vec<(String, String)> = Vec::with_capacity(sections.len());

        for section in sections {
            let Some(template) = templates.iter().find(|t| t.section_id == section.section_id)
            else {
                return SaveOutcome {
                    success: false,
                    columns_updated: Vec::new(),
                    error: Some(format!(
                        "No template for generated section: {}",
                        section.section_id
                    )),
                };
            };
            entries.push((template.column.clone(), section.content.clone()));
        }

        if entries.is_empty() {
            return SaveOutcome {
                success: true,
                columns_updated: Vec::new(),
                error: None,
            };
        }

        match self
            .store
            .save_document_sections(listing_id, document_type, &entries)
            .await
        {
            Ok(()) => SaveOutcome {
                success: true,
                columns_updated: entries.into_iter().map(|(c, _)| c).collect(),
                error: None,
            },
            Err(e) => {
                tracing::error!(
                    listing_id = %listing_id,
                    document_type = %document_type,
                    error = %e,
                    "Failed to save generated sections"
                );
                SaveOutcome {
                    success: false,
                    columns_updated: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, Result};
    use crate::pipeline::KnowledgeContext;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingStore {
        fail: bool,
        saved: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn listing_exists(&self, _id: Uuid) -> Result<bool> {
            Ok(true)
        }

        async fn issuer_exists(&self, _id: Uuid) -> Result<bool> {
            Ok(true)
        }

        async fn fetch_knowledge_documents(&self, _ids: &[Uuid]) -> Result<Vec<KnowledgeContext>> {
            Ok(Vec::new())
        }

        async fn save_document_sections(
            &self,
            _listing_id: Uuid,
            _document_type: &str,
            entries: &[(String, String)],
        ) -> Result<()> {
            if self.fail {
                return Err(AppError::DatabaseConnection {
                    message: "connection reset".to_string(),
                });
            }
            self.saved.lock().unwrap().extend_from_slice(entries);
            Ok(())
        }
    }

    fn fixtures() -> (Vec<SectionTemplate>, Vec<GeneratedSection>) {
        let templates = vec![
            SectionTemplate::new("risk_factors", "Risk Factors", "risk_factors", "p"),
            SectionTemplate::new(
                "use_of_proceeds",
                "Use of Proceeds",
                "use_of_proceeds",
                "p",
            ),
        ];
        let sections = vec![
            GeneratedSection {
                section_id: "risk_factors".to_string(),
                title: "Risk Factors".to_string(),
                content: "risk text".to_string(),
                preview: "risk text".to_string(),
            },
            GeneratedSection {
                section_id: "use_of_proceeds".to_string(),
                title: "Use of Proceeds".to_string(),
                content: "proceeds text".to_string(),
                preview: "proceeds text".to_string(),
            },
        ];
        (templates, sections)
    }

    #[tokio::test]
    async fn test_save_reports_exactly_the_written_columns() {
        let store = Arc::new(RecordingStore {
            fail: false,
            saved: Mutex::new(Vec::new()),
        });
        let handler = OutputHandler::new(store.clone());
        let (templates, sections) = fixtures();

        let outcome = handler
            .save(Uuid::new_v4(), "listing_particulars", &templates, &sections)
            .await;

        assert!(outcome.success);
        assert_eq!(
            outcome.columns_updated,
            vec!["risk_factors", "use_of_proceeds"]
        );
        assert_eq!(store.saved.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_save_reports_no_columns() {
        let store = Arc::new(RecordingStore {
            fail: true,
            saved: Mutex::new(Vec::new()),
        });
        let handler = OutputHandler::new(store.clone());
        let (templates, sections) = fixtures();

        let outcome = handler
            .save(Uuid::new_v4(), "listing_particulars", &templates, &sections)
            .await;

        assert!(!outcome.success);
        assert!(outcome.columns_updated.is_empty());
        assert!(outcome.error.unwrap().contains("connection reset"));
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_sections_save_nothing() {
        let store = Arc::new(RecordingStore {
            fail: false,
            saved: Mutex::new(Vec::new()),
        });
        let handler = OutputHandler::new(store.clone());

        let outcome = handler
            .save(Uuid::new_v4(), "listing_particulars", &[], &[])
            .await;

        assert!(outcome.success);
        assert!(outcome.columns_updated.is_empty());
        assert!(store.saved.lock().unwrap().is_empty());
    }
}
