//! Intelligence layer: the LLM-backed capability surface, vector search,
//! and prompt rendering used across the orchestrator.
//!
//! - [`capability`]: the `IntelligenceProvider` trait the rest of the
//!   workspace calls by name, plus its deterministic no-provider fallback.
//! - [`llm`]: thin per-vendor `LlmProvider` clients (`capability` is the
//!   seam the rest of the workspace actually depends on).
//! - [`vector_store`]: the `VectorStore` trait used for task deduplication
//!   and memory retrieval, with an in-memory default.
//! - [`prompt`]: initial-prompt rendering shared by the LLM-backed and
//!   deterministic providers.

pub mod capability;
pub mod llm;
pub mod prompt;
pub mod vector_store;

pub use capability::{
    CapabilityError, CoherenceAnalysis, DeterministicProvider, IntelligenceProvider,
    LlmBackedProvider, PromptContext, TaskEnrichment, TrajectoryAnalysis,
};
pub use llm::{
    AnthropicProvider, LlmConfig, LlmError, LlmMessage, LlmProvider, LlmResponse, LlmRole,
    LlmUsageTracker, MockProvider as LlmMockProvider, OpenAiProvider,
};
pub use vector_store::{InMemoryVectorStore, ScoredMatch, VectorRecord, VectorStore};

use thiserror::Error;

/// Crate-level error for operations that don't fit the finer-grained
/// per-module error types.
#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}
