//! Document generation pipeline
//!
//! Coordinates multi-stage AI content generation for listing documents:
//! template extraction, per-section generation, and persistence, with
//! incremental progress reporting through the [`crate::progress::ProgressStore`].

mod extractor;
mod generator;
mod orchestrator;
mod output;
mod templates;

pub use extractor::{Extraction, TemplateExtractor};
pub use generator::SectionGenerator;
pub use orchestrator::{DocumentOrchestrator, GenerationOutcome, GenerationParams, GenerationStats};
pub use output::{OutputHandler, SaveOutcome};
pub use templates::{SectionTemplate, TemplateRegistry};

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output of generation for one section template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSection {
    /// Section identifier, matches the template's section id
    pub section_id: String,

    /// Human-readable title derived from the template
    pub title: String,

    /// Full generated text
    pub content: String,

    /// Truncated content for list views
    pub preview: String,
}

/// A requested section that was never sent to generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedTemplate {
    pub section_id: String,
    pub reason: String,
}

/// Knowledge-base document content included verbatim as retrieval context
#[derive(Debug, Clone)]
pub struct KnowledgeContext {
    pub id: Uuid,
    pub title: String,
    pub content: String,
}

/// Persistence capability consumed by the pipeline
///
/// Implemented by [`crate::db::Repository`] in production and by in-memory
/// fakes in tests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Check whether a listing exists
    async fn listing_exists(&self, id: Uuid) -> Result<bool>;

    /// Check whether an issuer exists
    async fn issuer_exists(&self, id: Uuid) -> Result<bool>;

    /// Fetch knowledge-base documents by id, preserving request order
    async fn fetch_knowledge_documents(&self, ids: &[Uuid]) -> Result<Vec<KnowledgeContext>>;

    /// Persist generated section content into the listing's document record.
    ///
    /// Must write all entries in a single atomic statement; a failure writes
    /// nothing. Each entry is (destination column, content).
    async fn save_document_sections(
        &self,
        listing_id: Uuid,
        document_type: &str,
        entries: &[(String, String)],
    ) -> Result<()>;
}
