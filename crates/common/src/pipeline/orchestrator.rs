//! Generation run orchestration
//!
//! Sequences template extraction, per-section generation, and persistence
//! for one generation session, funnelling every stage transition through the
//! progress store so polling clients always observe the latest state.
//!
//! Sections are generated sequentially, not concurrently, to bound cost and
//! rate against the completion service and to keep progress updates
//! race-free.

use super::extractor::TemplateExtractor;
use super::generator::SectionGenerator;
use super::output::OutputHandler;
use super::templates::TemplateRegistry;
use super::{DocumentStore, GeneratedSection, SkippedTemplate};
use crate::errors::{AppError, Result};
use crate::llm::CompletionClient;
use crate::progress::{ProgressStore, Stage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Parameters of one generation request
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub listing_id: Uuid,
    pub issuer_id: Uuid,
    pub sections: Vec<String>,
    pub knowledge_document_ids: Vec<Uuid>,
    pub document_type: String,
}

/// Counters summarizing a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub requested: usize,
    pub generated: usize,
    pub skipped: usize,
    pub saved: usize,
    pub duration_ms: u64,
}

/// Aggregate result of a successful run
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub sections: Vec<GeneratedSection>,
    pub skipped_templates: Vec<SkippedTemplate>,
    pub saved_columns: Vec<String>,
    pub stats: GenerationStats,
}

/// Coordinates one generation session end to end
pub struct DocumentOrchestrator {
    store: Arc<dyn DocumentStore>,
    extractor: TemplateExtractor,
    generator: SectionGenerator,
    output: OutputHandler,
    progress: ProgressStore,
}

impl DocumentOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn CompletionClient>,
        registry: TemplateRegistry,
        progress: ProgressStore,
    ) -> Self {
        Self {
            extractor: TemplateExtractor::new(registry),
            generator: SectionGenerator::new(llm, store.clone()),
            output: OutputHandler::new(store.clone()),
            store,
            progress,
        }
    }

    /// Override the extractor (used by tests to shrink the column set)
    pub fn with_extractor(mut self, extractor: TemplateExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Run one generation session.
    ///
    /// Any failure funnels through [`ProgressStore::fail`] before the error
    /// is returned, so a polling client always observes the terminal error
    /// stage with the message text.
    pub async fn run(&self, session_id: &str, params: GenerationParams) -> Result<GenerationOutcome> {
        let start = Instant::now();
        self.progress.start(session_id).await;

        match self.run_inner(session_id, &params, start).await {
            Ok(outcome) => {
                crate::metrics::record_generation(
                    start.elapsed().as_secs_f64(),
                    outcome.stats.generated,
                    outcome.stats.skipped,
                    "completed",
                );
                Ok(outcome)
            }
            Err(e) => {
                self.progress.fail(session_id, &e.to_string()).await;
                crate::metrics::record_generation(start.elapsed().as_secs_f64(), 0, 0, "error");
                tracing::error!(
                    session_id = %session_id,
                    listing_id = %params.listing_id,
                    error = %e,
                    "Generation run failed"
                );
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        session_id: &str,
        params: &GenerationParams,
        start: Instant,
    ) -> Result<GenerationOutcome> {
        // Validate referenced entities before spending any generation cost
        if !self.store.listing_exists(params.listing_id).await? {
            return Err(AppError::ListingNotFound {
                id: params.listing_id.to_string(),
            });
        }
        if !self.store.issuer_exists(params.issuer_id).await? {
            return Err(AppError::IssuerNotFound {
                id: params.issuer_id.to_string(),
            });
        }
        self.progress
            .update(session_id, Stage::Validated, 10, "Listing and issuer validated")
            .await;

        self.progress
            .update(session_id, Stage::Extracting, 20, "Resolving section templates")
            .await;

        let extraction = self.extractor.extract(&params.sections);
        let total = extraction.valid.len();

        self.progress.set_total_sections(session_id, total).await;
        self.progress
            .update(
                session_id,
                Stage::TemplatesExtracted,
                40,
                &format!(
                    "Resolved {} templates ({} skipped)",
                    total,
                    extraction.skipped.len()
                ),
            )
            .await;

        // Sequential by design; see module docs
        let mut sections: Vec<GeneratedSection> = Vec::with_capacity(total);
        for (index, template) in extraction.valid.iter().enumerate() {
            self.progress
                .section_started(session_id, &template.section_id)
                .await;

            tracing::info!(
                session_id = %session_id,
                section = %template.section_id,
                position = index + 1,
                total,
                "Generating section"
            );

            let section = self
                .generator
                .generate(template, &params.knowledge_document_ids)
                .await?;

            let completed = index + 1;
            let percent = 40 + ((completed as f64 / total as f64) * 60.0).round() as u8;
            self.progress
                .section_completed(session_id, &template.section_id, percent)
                .await;

            sections.push(section);
        }

        self.progress
            .update(session_id, Stage::Saving, 95, "Saving generated sections")
            .await;

        let save = self
            .output
            .save(
                params.listing_id,
                &params.document_type,
                &extraction.valid,
                &sections,
            )
            .await;

        if !save.success {
            return Err(AppError::SaveFailed {
                message: save
                    .error
                    .unwrap_or_else(|| "unknown persistence failure".to_string()),
            });
        }

        let stats = GenerationStats {
            requested: params.sections.len(),
            generated: sections.len(),
            skipped: extraction.skipped.len(),
            saved: save.columns_updated.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        self.progress
            .complete(
                session_id,
                &format!("Generated {} sections, saved {} columns", stats.generated, stats.saved),
            )
            .await;

        tracing::info!(
            session_id = %session_id,
            listing_id = %params.listing_id,
            generated = stats.generated,
            skipped = stats.skipped,
            saved = stats.saved,
            duration_ms = stats.duration_ms,
            "Generation run completed"
        );

        Ok(GenerationOutcome {
            sections,
            skipped_templates: extraction.skipped,
            saved_columns: save.columns_updated,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::templates::SectionTemplate;
    use crate::pipeline::KnowledgeContext;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeStore {
        listing_id: Uuid,
        issuer_id: Uuid,
        fail_save: bool,
        saved: Mutex<Vec<(String, String)>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                listing_id: Uuid::new_v4(),
                issuer_id: Uuid::new_v4(),
                fail_save: false,
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn listing_exists(&self, id: Uuid) -> Result<bool> {
            Ok(id == self.listing_id)
        }

        async fn issuer_exists(&self, id: Uuid) -> Result<bool> {
            Ok(id == self.issuer_id)
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
            if self.fail_save {
                return Err(AppError::DatabaseConnection {
                    message: "write refused".to_string(),
                });
            }
            self.saved.lock().unwrap().extend_from_slice(entries);
            Ok(())
        }
    }

    /// Completion client that fails on the nth call (1-based), if set
    struct ScriptedLlm {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
    }

    impl ScriptedLlm {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on_call: None,
            }
        }

        fn failing_on(n: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on_call: Some(n),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_call == Some(call) {
                return Err(AppError::Generation {
                    message: "completion provider unavailable".to_string(),
                });
            }
            Ok(format!("generated content {}", call))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn test_registry() -> TemplateRegistry {
        TemplateRegistry::from_templates(vec![
            SectionTemplate::new("sec1prompt", "Section One", "business_description", "p1"),
            SectionTemplate::new("badprompt", "Orphan", "dropped_column", "p2"),
            SectionTemplate::new("risk_factors", "Risk Factors", "risk_factors", "p3"),
            SectionTemplate::new("use_of_proceeds", "Use of Proceeds", "use_of_proceeds", "p4"),
        ])
    }

    fn test_extractor() -> TemplateExtractor {
        let columns: HashSet<String> =
            ["business_description", "risk_factors", "use_of_proceeds"]
                .iter()
                .map(|s| s.to_string())
                .collect();
        TemplateExtractor::with_columns(test_registry(), columns)
    }

    fn orchestrator(store: Arc<FakeStore>, llm: Arc<dyn CompletionClient>) -> (DocumentOrchestrator, ProgressStore) {
        let progress = ProgressStore::new();
        let orch = DocumentOrchestrator::new(
            store,
            llm,
            test_registry(),
            progress.clone(),
        )
        .with_extractor(test_extractor());
        (orch, progress)
    }

    fn params(store: &FakeStore, sections: &[&str]) -> GenerationParams {
        GenerationParams {
            listing_id: store.listing_id,
            issuer_id: store.issuer_id,
            sections: sections.iter().map(|s| s.to_string()).collect(),
            knowledge_document_ids: Vec::new(),
            document_type: "listing_particulars".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mixed_valid_and_skipped_sections() {
        let store = Arc::new(FakeStore::new());
        let (orch, progress) = orchestrator(store.clone(), Arc::new(ScriptedLlm::ok()));
        let params = params(&store, &["sec1prompt", "badprompt"]);

        let outcome = orch.run("s1", params).await.unwrap();

        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.sections[0].section_id, "sec1prompt");
        assert_eq!(outcome.skipped_templates.len(), 1);
        assert_eq!(outcome.skipped_templates[0].section_id, "badprompt");
        assert_eq!(outcome.skipped_templates[0].reason, "no database column");
        assert_eq!(outcome.saved_columns, vec!["business_description"]);
        assert_eq!(outcome.stats.saved, 1);

        let snap = progress.snapshot("s1").await.unwrap();
        assert_eq!(snap.stage, Stage::Completed);
        assert_eq!(snap.percent, 100);
    }

    #[tokio::test]
    async fn test_unknown_listing_is_not_found() {
        let store = Arc::new(FakeStore::new());
        let (orch, progress) = orchestrator(store.clone(), Arc::new(ScriptedLlm::ok()));
        let bogus = Uuid::new_v4();
        let mut p = params(&store, &["sec1prompt"]);
        p.listing_id = bogus;

        let err = orch.run("s1", p).await.unwrap_err();

        assert!(matches!(err, AppError::ListingNotFound { .. }));
        assert!(err.to_string().contains(&bogus.to_string()));

        // Session never reached generation
        let snap = progress.snapshot("s1").await.unwrap();
        assert_eq!(snap.stage, Stage::Error);
        assert!(snap.completed_sections.is_empty());
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_aborts_without_partial_save() {
        let store = Arc::new(FakeStore::new());
        // Second of three sections fails
        let (orch, progress) = orchestrator(store.clone(), Arc::new(ScriptedLlm::failing_on(2)));
        let params = params(&store, &["sec1prompt", "risk_factors", "use_of_proceeds"]);

        let err = orch.run("s1", params).await.unwrap_err();

        assert!(matches!(err, AppError::Generation { .. }));
        let snap = progress.snapshot("s1").await.unwrap();
        assert_eq!(snap.stage, Stage::Error);
        assert!(snap.error.unwrap().contains("completion provider unavailable"));

        // No columns written for any of the three sections
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_reports_save_failed() {
        let mut fake = FakeStore::new();
        fake.fail_save = true;
        let store = Arc::new(fake);
        let (orch, progress) = orchestrator(store.clone(), Arc::new(ScriptedLlm::ok()));
        let params = params(&store, &["sec1prompt"]);

        let err = orch.run("s1", params).await.unwrap_err();

        assert!(matches!(err, AppError::SaveFailed { .. }));
        let snap = progress.snapshot("s1").await.unwrap();
        assert_eq!(snap.stage, Stage::Error);
    }

    #[tokio::test]
    async fn test_progress_reaches_100_through_sections() {
        let store = Arc::new(FakeStore::new());
        let (orch, progress) = orchestrator(store.clone(), Arc::new(ScriptedLlm::ok()));
        let params = params(&store, &["sec1prompt", "risk_factors"]);

        orch.run("s1", params).await.unwrap();

        let snap = progress.snapshot("s1").await.unwrap();
        assert_eq!(snap.percent, 100);
        assert_eq!(
            snap.completed_sections,
            vec!["sec1prompt", "risk_factors"]
        );
        assert_eq!(snap.total_sections, 2);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_do_not_interfere() {
        let store = Arc::new(FakeStore::new());
        let (orch, progress) = orchestrator(store.clone(), Arc::new(ScriptedLlm::ok()));

        let p1 = params(&store, &["sec1prompt"]);
        let p2 = params(&store, &["risk_factors"]);

        orch.run("a", p1).await.unwrap();

        // Second session starts after the first completed
        progress.start("b").await;

        let a = progress.snapshot("a").await.unwrap();
        let b = progress.snapshot("b").await.unwrap();
        assert_eq!(a.stage, Stage::Completed);
        assert_eq!(b.stage, Stage::Starting);

        orch.run("b", p2).await.unwrap();
        let a_after = progress.snapshot("a").await.unwrap();
        assert_eq!(a_after.completed_sections, vec!["sec1prompt"]);
    }

    #[tokio::test]
    async fn test_all_sections_skipped_saves_nothing() {
        let store = Arc::new(FakeStore::new());
        let (orch, _progress) = orchestrator(store.clone(), Arc::new(ScriptedLlm::ok()));
        let params = params(&store, &["badprompt", "never_registered"]);

        let outcome = orch.run("s1", params).await.unwrap();

        assert!(outcome.sections.is_empty());
        assert_eq!(outcome.skipped_templates.len(), 2);
        assert_eq!(outcome.stats.saved, 0);
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_section_generated_once() {
        let store = Arc::new(FakeStore::new());
        let (orch, _progress) = orchestrator(store.clone(), Arc::new(ScriptedLlm::ok()));
        let params = params(&store, &["sec1prompt", "sec1prompt"]);

        let outcome = orch.run("s1", params).await.unwrap();

        assert_eq!(outcome.sections.len(), 1);
        assert_eq!(outcome.skipped_templates[0].reason, "duplicate section id");
        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }
}
