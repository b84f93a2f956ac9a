//! Capability interface: the handful of LLM-backed operations the rest of
//! the workspace calls by name (task enrichment, embeddings, trajectory and
//! coherence analysis, ticket clarification, agent prompt generation)
//! rather than talking to [`crate::llm::LlmProvider`] directly.
//!
//! `hp-agents`/`hp-queue`/`hp-tickets` depend on this trait, not on `llm`
//! directly, so a deterministic fallback can stand in whenever no provider
//! is configured or a call fails: LLM failures degrade, they never abort
//! the operation that requested them.

use async_trait::async_trait;
use hp_core::types::{Phase, Task, Ticket};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{LlmConfig, LlmError, LlmMessage, LlmProvider};

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("llm provider error: {0}")]
    Llm(#[from] LlmError),
    #[error("invalid capability response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Output of [`IntelligenceProvider::enrich_task`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnrichment {
    pub enriched_description: String,
    pub completion_criteria: Vec<String>,
    pub estimated_complexity: i32,
}

/// Output of [`IntelligenceProvider::analyze_trajectory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryAnalysis {
    pub on_track: bool,
    pub concerns: Vec<String>,
    pub recommendation: String,
}

/// Output of [`IntelligenceProvider::analyze_coherence`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoherenceAnalysis {
    pub coherent: bool,
    pub notes: String,
}

/// Context passed to [`IntelligenceProvider::generate_agent_prompt`] beyond
/// the task/phase identifiers already on [`Task`]/[`Phase`].
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub workflow_level_goal: Option<String>,
    pub cross_phase_summaries: Vec<String>,
    pub memory_snippets: Vec<String>,
}

/// The LLM-backed capability surface used by the rest of the workspace.
///
/// Every method degrades to a deterministic fallback on provider failure;
/// callers should treat `Err` as exceptional (provider entirely absent or
/// malformed wiring), not as the expected response to an LLM outage.
#[async_trait]
pub trait IntelligenceProvider: Send + Sync {
    async fn enrich_task(&self, task: &Task, phase: Option<&Phase>, ctx: &PromptContext) -> Result<TaskEnrichment>;

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>>;

    async fn analyze_trajectory(&self, task: &Task, recent_output: &str) -> Result<TrajectoryAnalysis>;

    async fn analyze_coherence(&self, task: &Task, agent_output: &str) -> Result<CoherenceAnalysis>;

    async fn resolve_ticket_clarification(
        &self,
        ticket: &Ticket,
        conflict_description: &str,
        context: &str,
        potential_solutions: &[String],
    ) -> Result<String>;

    async fn generate_agent_prompt(&self, task: &Task, phase: Option<&Phase>, ctx: &PromptContext) -> Result<String>;
}

// ---------------------------------------------------------------------------
// LlmBackedProvider: IntelligenceProvider over any LlmProvider
// ---------------------------------------------------------------------------

/// Default [`IntelligenceProvider`] implementation: wraps any
/// [`LlmProvider`] and falls back to deterministic heuristics whenever the
/// provider call fails, rather than propagating the error upward.
pub struct LlmBackedProvider {
    llm: Box<dyn LlmProvider>,
    config: LlmConfig,
}

impl LlmBackedProvider {
    pub fn new(llm: Box<dyn LlmProvider>, config: LlmConfig) -> Self {
        Self { llm, config }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let messages = [LlmMessage::system(system), LlmMessage::user(user)];
        let response = self.llm.complete(&messages, &self.config).await?;
        Ok(response.content)
    }
}

#[async_trait]
impl IntelligenceProvider for LlmBackedProvider {
    async fn enrich_task(&self, task: &Task, phase: Option<&Phase>, ctx: &PromptContext) -> Result<TaskEnrichment> {
        let phase_note = phase.map(|p| format!(" (phase: {})", p.name)).unwrap_or_default();
        let memory_note = if ctx.memory_snippets.is_empty() {
            String::new()
        } else {
            format!("\n\nRelevant past memories:\n- {}", ctx.memory_snippets.join("\n- "))
        };
        let prompt = format!(
            "Expand this task description into a fuller, actionable one{phase_note}.\n\nRaw description: {}\nDone definition: {}{memory_note}",
            task.raw_description, task.done_definition
        );
        match self.complete("You refine task descriptions for autonomous coding agents.", &prompt).await {
            Ok(content) => Ok(TaskEnrichment {
                enriched_description: content,
                completion_criteria: vec![task.done_definition.clone()],
                estimated_complexity: 3,
            }),
            Err(_) => Ok(deterministic_enrichment(task)),
        }
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        // No dedicated embeddings endpoint is wired through `LlmProvider`;
        // fall back to the deterministic hashed embedding used across the
        // workspace whenever no vector-capable provider is configured.
        Ok(deterministic_embedding(text))
    }

    async fn analyze_trajectory(&self, _task: &Task, recent_output: &str) -> Result<TrajectoryAnalysis> {
        let prompt = format!("Recent agent output:\n{recent_output}\n\nIs the agent on track to complete its task?");
        match self.complete("You monitor coding-agent sessions for drift.", &prompt).await {
            Ok(content) => Ok(TrajectoryAnalysis {
                on_track: !content.to_lowercase().contains("off track"),
                concerns: Vec::new(),
                recommendation: content,
            }),
            Err(_) => Ok(TrajectoryAnalysis {
                on_track: true,
                concerns: Vec::new(),
                recommendation: "no analysis available".into(),
            }),
        }
    }

    async fn analyze_coherence(&self, _task: &Task, agent_output: &str) -> Result<CoherenceAnalysis> {
        let prompt = format!("Agent output:\n{agent_output}\n\nIs this output internally coherent and on-topic?");
        match self.complete("You check coding-agent output for coherence.", &prompt).await {
            Ok(content) => Ok(CoherenceAnalysis {
                coherent: !content.to_lowercase().contains("incoherent"),
                notes: content,
            }),
            Err(_) => Ok(CoherenceAnalysis {
                coherent: true,
                notes: "no analysis available".into(),
            }),
        }
    }

    async fn resolve_ticket_clarification(
        &self,
        ticket: &Ticket,
        conflict_description: &str,
        context: &str,
        potential_solutions: &[String],
    ) -> Result<String> {
        let solutions = if potential_solutions.is_empty() {
            "(none proposed)".to_string()
        } else {
            potential_solutions.join("\n- ")
        };
        let prompt = format!(
            "Ticket: {} ({})\nConflict: {conflict_description}\nContext:\n{context}\nPotential solutions:\n- {solutions}\n\nWrite a short authoritative markdown resolution.",
            ticket.title, ticket.id
        );
        match self.complete("You arbitrate conflicting task/ticket claims and write binding resolutions.", &prompt).await {
            Ok(content) => Ok(content),
            Err(_) => Ok(format!(
                "## Resolution pending\n\nNo LLM provider was available to arbitrate ticket {}. Manual review required.",
                ticket.id
            )),
        }
    }

    async fn generate_agent_prompt(&self, task: &Task, phase: Option<&Phase>, ctx: &PromptContext) -> Result<String> {
        Ok(crate::prompt::render_initial_prompt(task, phase, ctx))
    }
}

// ---------------------------------------------------------------------------
// Deterministic fallbacks
// ---------------------------------------------------------------------------

fn deterministic_enrichment(task: &Task) -> TaskEnrichment {
    TaskEnrichment {
        enriched_description: task.raw_description.clone(),
        completion_criteria: vec![task.done_definition.clone()],
        estimated_complexity: 3,
    }
}

/// A cheap, order-preserving hashed embedding used whenever no real
/// embeddings endpoint is configured. Not semantically meaningful beyond
/// rough lexical overlap, but stable and dependency-free.
pub fn deterministic_embedding(text: &str) -> Vec<f32> {
    const DIMS: usize = 64;
    let mut v = vec![0f32; DIMS];
    for (i, word) in text.split_whitespace().enumerate() {
        let mut hash: u64 = 1469598103934665603;
        for b in word.bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        let bucket = (hash as usize) % DIMS;
        v[bucket] += 1.0 / ((i + 1) as f32).sqrt();
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

/// No-provider fallback: always returns deterministic results, never calls
/// out to a network provider. Used when no LLM API key is configured.
pub struct DeterministicProvider;

#[async_trait]
impl IntelligenceProvider for DeterministicProvider {
    async fn enrich_task(&self, task: &Task, _phase: Option<&Phase>, _ctx: &PromptContext) -> Result<TaskEnrichment> {
        Ok(deterministic_enrichment(task))
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        Ok(deterministic_embedding(text))
    }

    async fn analyze_trajectory(&self, _task: &Task, _recent_output: &str) -> Result<TrajectoryAnalysis> {
        Ok(TrajectoryAnalysis { on_track: true, concerns: Vec::new(), recommendation: "no analysis available".into() })
    }

    async fn analyze_coherence(&self, _task: &Task, _agent_output: &str) -> Result<CoherenceAnalysis> {
        Ok(CoherenceAnalysis { coherent: true, notes: "no analysis available".into() })
    }

    async fn resolve_ticket_clarification(
        &self,
        ticket: &Ticket,
        _conflict_description: &str,
        _context: &str,
        _potential_solutions: &[String],
    ) -> Result<String> {
        Ok(format!("## Resolution pending\n\nNo LLM provider configured for ticket {}. Manual review required.", ticket.id))
    }

    async fn generate_agent_prompt(&self, task: &Task, phase: Option<&Phase>, ctx: &PromptContext) -> Result<String> {
        Ok(crate::prompt::render_initial_prompt(task, phase, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn deterministic_provider_enriches_without_a_network_call() {
        let provider = DeterministicProvider;
        let task = Task::new(Uuid::new_v4(), "fix the bug", "bug no longer reproduces");
        let enrichment = provider.enrich_task(&task, None, &PromptContext::default()).await.unwrap();
        assert_eq!(enrichment.enriched_description, "fix the bug");
        assert_eq!(enrichment.completion_criteria, vec!["bug no longer reproduces".to_string()]);
    }

    #[test]
    fn embeddings_are_normalized() {
        let v = deterministic_embedding("hello world hello");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[tokio::test]
    async fn clarification_fallback_names_the_ticket() {
        let provider = DeterministicProvider;
        let ticket = Ticket::new(Uuid::new_v4(), "t", "description here", "feature", hp_core::types::TaskPriority::Medium, "backlog", false);
        let resolution = provider
            .resolve_ticket_clarification(&ticket, "two agents disagree", "", &[])
            .await
            .unwrap();
        assert!(resolution.contains(&ticket.id.to_string()));
    }
}
