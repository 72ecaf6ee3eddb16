//! Document generation handlers
//!
//! POST starts a generation run and blocks until it finishes; GET polls the
//! in-memory progress store by session id while a run is in flight.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use docgen_common::{
    errors::{AppError, Result},
    metrics::RequestMetrics,
    pipeline::{GeneratedSection, GenerationParams, GenerationStats, SkippedTemplate},
    progress::{new_session_id, Stage},
};

/// Request to generate document sections.
///
/// Field names match the portal's existing wire format.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateDocumentRequest {
    /// Listing (instrument) identifier
    pub instrumentid: Uuid,

    /// Issuer identifier
    pub instrumentissuerid: Uuid,

    /// Requested section identifiers
    #[validate(length(min = 1, message = "at least one section is required"))]
    pub sections: Vec<String>,

    /// Knowledge-base document ids used as retrieval context
    #[serde(default, rename = "selectedDocuments")]
    pub selected_documents: Vec<Uuid>,

    /// Document type tag
    #[serde(default = "default_document_type", rename = "documentType")]
    pub document_type: String,
}

fn default_document_type() -> String {
    "listing_particulars".to_string()
}

/// Successful generation response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDocumentResponse {
    pub success: bool,
    pub session_id: String,
    pub sections: Vec<GeneratedSection>,
    pub saved_count: usize,
    pub skipped_templates: Vec<SkippedTemplate>,
    pub stats: GenerationStats,
}

/// Failure response, with session context when the run got far enough
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDocumentError {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

/// Start a generation run
pub async fn generate_document(
    State(state): State<AppState>,
    Json(request): Json<GenerateDocumentRequest>,
) -> Response {
    let metrics = RequestMetrics::start("POST", "/api/ai/generate-document");

    let response = generate_document_inner(state, request).await;

    metrics.finish(response.status().as_u16());
    response
}

async fn generate_document_inner(state: AppState, request: GenerateDocumentRequest) -> Response {
    if let Err(e) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(GenerateDocumentError {
                success: false,
                error: format!("Validation failed: {}", e),
                session_id: None,
                stage: None,
            }),
        )
            .into_response();
    }

    let session_id = new_session_id();

    tracing::info!(
        session_id = %session_id,
        listing_id = %request.instrumentid,
        issuer_id = %request.instrumentissuerid,
        sections = request.sections.len(),
        document_type = %request.document_type,
        "Generation request received"
    );

    let params = GenerationParams {
        listing_id: request.instrumentid,
        issuer_id: request.instrumentissuerid,
        sections: request.sections,
        knowledge_document_ids: request.selected_documents,
        document_type: request.document_type,
    };

    match state.orchestrator.run(&session_id, params).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(GenerateDocumentResponse {
                success: true,
                session_id,
                sections: outcome.sections,
                saved_count: outcome.stats.saved,
                skipped_templates: outcome.skipped_templates,
                stats: outcome.stats,
            }),
        )
            .into_response(),
        Err(e) => {
            let stage = state
                .progress
                .snapshot(&session_id)
                .await
                .map(|snap| snap.stage);

            (
                e.status_code(),
                Json(GenerateDocumentError {
                    success: false,
                    error: e.to_string(),
                    session_id: Some(session_id),
                    stage,
                }),
            )
                .into_response()
        }
    }
}

/// Progress poll query parameters
#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Per-section completion sub-state
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub completed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    pub total: usize,
}

/// Progress poll response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub session_id: String,
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub section_progress: SectionProgress,
    pub timestamp: DateTime<Utc>,
}

/// Poll generation progress by session id
pub async fn get_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>> {
    let session_id = query.session_id.ok_or_else(|| AppError::MissingField {
        field: "sessionId".to_string(),
    })?;

    // Sessions survive only as long as the process; a restart loses them
    let snapshot = state
        .progress
        .snapshot(&session_id)
        .await
        .ok_or_else(|| AppError::SessionNotFound {
            id: session_id.clone(),
        })?;

    Ok(Json(ProgressResponse {
        session_id: snapshot.session_id,
        stage: snapshot.stage,
        percent: snapshot.percent,
        message: snapshot.message,
        error: snapshot.error,
        section_progress: SectionProgress {
            completed: snapshot.completed_sections,
            current: snapshot.current_section,
            total: snapshot.total_sections,
        },
        timestamp: snapshot.updated_at,
    }))
}
