//! Shared library for the listing document generation service
//!
//! Shared code for the gateway binary including:
//! - Database models and repository patterns
//! - LLM completion client abstraction
//! - Document generation pipeline
//! - In-memory progress tracking
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod progress;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use db::Repository;
pub use llm::CompletionClient;
pub use pipeline::DocumentOrchestrator;
pub use progress::ProgressStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

/// Preview length for generated section content, in characters
pub const SECTION_PREVIEW_CHARS: usize = 200;
