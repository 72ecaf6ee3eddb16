//! In-memory progress tracking for generation sessions
//!
//! Process-local map from session id to the latest progress snapshot, polled
//! by clients via the gateway. State is lost on restart; no durability or
//! cross-instance sharing is provided.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Pipeline stage of a generation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Starting,
    Validated,
    Extracting,
    TemplatesExtracted,
    GeneratingSections,
    Saving,
    Completed,
    Error,
}

impl Stage {
    /// Check whether the stage is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Error)
    }
}

/// Latest observable state of one generation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub session_id: String,

    pub stage: Stage,

    /// 0-100, monotonically non-decreasing within a session
    pub percent: u8,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Section ids that finished generating, in completion order
    pub completed_sections: Vec<String>,

    /// Section currently in flight, if any
    pub current_section: Option<String>,

    /// Number of sections accepted for generation
    pub total_sections: usize,

    pub updated_at: DateTime<Utc>,
}

/// Generate a new opaque session identifier
pub fn new_session_id() -> String {
    format!("gen_{}", Uuid::new_v4().simple())
}

/// Process-local progress store shared across concurrent requests
#[derive(Clone, Default)]
pub struct ProgressStore {
    inner: Arc<RwLock<HashMap<String, ProgressSnapshot>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session at the starting stage
    pub async fn start(&self, session_id: &str) {
        let snapshot = ProgressSnapshot {
            session_id: session_id.to_string(),
            stage: Stage::Starting,
            percent: 0,
            message: "Starting document generation".to_string(),
            error: None,
            completed_sections: Vec::new(),
            current_section: None,
            total_sections: 0,
            updated_at: Utc::now(),
        };

        self.inner
            .write()
            .await
            .insert(session_id.to_string(), snapshot);
    }

    /// Advance a session to a new stage.
    ///
    /// Percent is clamped so it never decreases within a session.
    pub async fn update(&self, session_id: &str, stage: Stage, percent: u8, message: &str) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.get_mut(session_id) {
            entry.stage = stage;
            entry.percent = entry.percent.max(percent.min(100));
            entry.message = message.to_string();
            entry.updated_at = Utc::now();
        }
    }

    /// Record how many sections were accepted for generation
    pub async fn set_total_sections(&self, session_id: &str, total: usize) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.get_mut(session_id) {
            entry.total_sections = total;
            entry.updated_at = Utc::now();
        }
    }

    /// Mark a section as currently generating
    pub async fn section_started(&self, session_id: &str, section_id: &str) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.get_mut(session_id) {
            entry.stage = Stage::GeneratingSections;
            entry.current_section = Some(section_id.to_string());
            entry.message = format!("Generating section: {}", section_id);
            entry.updated_at = Utc::now();
        }
    }

    /// Mark a section as completed and advance the percentage
    pub async fn section_completed(&self, session_id: &str, section_id: &str, percent: u8) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.get_mut(session_id) {
            entry.completed_sections.push(section_id.to_string());
            entry.current_section = None;
            entry.percent = entry.percent.max(percent.min(100));
            entry.message = format!("Completed section: {}", section_id);
            entry.updated_at = Utc::now();
        }
    }

    /// Move a session to the terminal error stage
    pub async fn fail(&self, session_id: &str, message: &str) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.get_mut(session_id) {
            entry.stage = Stage::Error;
            entry.error = Some(message.to_string());
            entry.message = format!("Generation failed: {}", message);
            entry.current_section = None;
            entry.updated_at = Utc::now();
        }
    }

    /// Move a session to the terminal completed stage
    pub async fn complete(&self, session_id: &str, message: &str) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.get_mut(session_id) {
            entry.stage = Stage::Completed;
            entry.percent = 100;
            entry.message = message.to_string();
            entry.current_section = None;
            entry.updated_at = Utc::now();
        }
    }

    /// Get the latest snapshot for a session, if known
    pub async fn snapshot(&self, session_id: &str) -> Option<ProgressSnapshot> {
        self.inner.read().await.get(session_id).cloned()
    }
}
