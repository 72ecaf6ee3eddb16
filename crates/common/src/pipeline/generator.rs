//! Per-section content generation
//!
//! Builds a retrieval context from the caller-supplied knowledge-base
//! document ids and invokes the completion service with the template's
//! prompt. Retries, where any, live inside the completion client.

use super::templates::SectionTemplate;
use super::{DocumentStore, GeneratedSection, KnowledgeContext};
use crate::errors::Result;
use crate::llm::CompletionClient;
use crate::SECTION_PREVIEW_CHARS;
use std::sync::Arc;
use uuid::Uuid;

const SYSTEM_PROMPT: &str =
    "You are a financial compliance writer drafting sections of an exchange \
    listing document. Write in a formal register suitable for regulatory \
    review. Ground every statement in the supplied reference material; where \
    the material is silent, state the assumption explicitly.";

/// Generates content for one section template at a time
pub struct SectionGenerator {
    llm: Arc<dyn CompletionClient>,
    store: Arc<dyn DocumentStore>,
}

impl SectionGenerator {
    pub fn new(llm: Arc<dyn CompletionClient>, store: Arc<dyn DocumentStore>) -> Self {
        Self { llm, store }
    }

    /// Generate one section from its template and knowledge-base context
    pub async fn generate(
        &self,
        template: &SectionTemplate,
        knowledge_document_ids: &[Uuid],
    ) -> Result<GeneratedSection> {
        let contexts = self
            .store
            .fetch_knowledge_documents(knowledge_document_ids)
            .await?;

        let prompt = build_prompt(template, &contexts);

        tracing::debug!(
            section = %template.section_id,
            context_documents = contexts.len(),
            model = self.llm.model_name(),
            "Invoking completion for section"
        );

        let content = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        let preview: String = content.chars().take(SECTION_PREVIEW_CHARS).collect();

        Ok(GeneratedSection {
            section_id: template.section_id.clone(),
            title: template.title.clone(),
            content,
            preview,
        })
    }
}

/// Assemble the user prompt: template instruction plus verbatim context
fn build_prompt(template: &SectionTemplate, contexts: &[KnowledgeContext]) -> String {
    let mut prompt = template.prompt.clone();

    if !contexts.is_empty() {
        prompt.push_str("\n\nReference material:\n");
        for (i, ctx) in contexts.iter().enumerate() {
            prompt.push_str(&format!("\n[{}] {}\n{}\n", i + 1, ctx.title, ctx.content));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use async_trait::async_trait;

    struct EchoLlm;

    #[async_trait]
    impl CompletionClient for EchoLlm {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            Ok(format!("GENERATED::{}", user))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct FixedStore {
        docs: Vec<KnowledgeContext>,
    }

    #[async_trait]
    impl DocumentStore for FixedStore {
        async fn listing_exists(&self, _id: Uuid) -> Result<bool> {
            Ok(true)
        }

        async fn issuer_exists(&self, _id: Uuid) -> Result<bool> {
            Ok(true)
        }

        async fn fetch_knowledge_documents(&self, ids: &[Uuid]) -> Result<Vec<KnowledgeContext>> {
            Ok(self
                .docs
                .iter()
                .filter(|d| ids.contains(&d.id))
                .cloned()
                .collect())
        }

        async fn save_document_sections(
            &self,
            _listing_id: Uuid,
            _document_type: &str,
            _entries: &[(String, String)],
        ) -> Result<()> {
            Err(AppError::Internal {
                message: "not used".to_string(),
            })
        }
    }

    fn template() -> SectionTemplate {
        SectionTemplate::new(
            "risk_factors",
            "Risk Factors",
            "risk_factors",
            "Write the risk factors section.",
        )
    }

    #[tokio::test]
    async fn test_generate_includes_context_verbatim() {
        let doc_id = Uuid::new_v4();
        let store = Arc::new(FixedStore {
            docs: vec![KnowledgeContext {
                id: doc_id,
                title: "Audited Accounts 2025".to_string(),
                content: "Revenue grew 14% year on year.".to_string(),
            }],
        });
        let generator = SectionGenerator::new(Arc::new(EchoLlm), store);

        let section = generator.generate(&template(), &[doc_id]).await.unwrap();

        assert_eq!(section.section_id, "risk_factors");
        assert_eq!(section.title, "Risk Factors");
        assert!(section.content.contains("Revenue grew 14% year on year."));
        assert!(section.content.contains("Write the risk factors section."));
    }

    #[tokio::test]
    async fn test_generate_without_context() {
        let store = Arc::new(FixedStore { docs: vec![] });
        let generator = SectionGenerator::new(Arc::new(EchoLlm), store);

        let section = generator.generate(&template(), &[]).await.unwrap();
        assert!(!section.content.contains("Reference material"));
    }

    #[tokio::test]
    async fn test_preview_is_truncated() {
        struct LongLlm;

        #[async_trait]
        impl CompletionClient for LongLlm {
            async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
                Ok("x".repeat(1000))
            }

            fn model_name(&self) -> &str {
                "long"
            }
        }

        let store = Arc::new(FixedStore { docs: vec![] });
        let generator = SectionGenerator::new(Arc::new(LongLlm), store);

        let section = generator.generate(&template(), &[]).await.unwrap();
        assert_eq!(section.preview.chars().count(), SECTION_PREVIEW_CHARS);
        assert_eq!(section.content.len(), 1000);
    }
}
