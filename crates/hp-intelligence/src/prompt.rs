//! Initial-prompt rendering for phase agents.
//!
//! Separated from [`crate::capability`] so both the LLM-backed provider and
//! the deterministic fallback render the exact same structure — the LLM call
//! in [`crate::capability::IntelligenceProvider::generate_agent_prompt`] only
//! ever augments individual fields, never the overall shape, so a validator
//! re-reading a dumped prompt always finds the same sections in the same
//! order regardless of which provider produced it.

use hp_core::types::{Phase, Task};

use crate::capability::PromptContext;

const TOOL_CONTRACT: &[&str] = &[
    "update_task_status",
    "save_memory",
    "create_task",
    "get_tasks",
    "broadcast_message",
    "send_message",
    "submit_result",
];

/// Render the initial message delivered to a newly spawned phase agent.
///
/// Every field is populated, using a placeholder for missing workflow ids
/// rather than omitting the section.
pub fn render_initial_prompt(task: &Task, phase: Option<&Phase>, ctx: &PromptContext) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Agent Assignment\n\n"));
    out.push_str(&format!("- Agent ID: {{agent_id}}\n"));
    out.push_str(&format!("- Task ID: {}\n", task.id));
    out.push_str(&format!(
        "- Workflow ID: {}\n",
        if task.workflow_id.is_nil() { "(none)".to_string() } else { task.workflow_id.to_string() }
    ));
    out.push_str(&format!("- Working Directory: {{working_directory}}\n\n"));

    let description = if task.enriched_description.trim().is_empty() {
        &task.raw_description
    } else {
        &task.enriched_description
    };
    out.push_str("## Task Description\n\n");
    out.push_str(description);
    out.push_str("\n\n## Completion Criteria\n\n");
    out.push_str(&task.done_definition);
    out.push('\n');

    if let Some(goal) = &ctx.workflow_level_goal {
        out.push_str("\n## Workflow-Level Goal\n\n");
        out.push_str(goal);
        out.push('\n');
    }

    if let Some(phase) = phase {
        out.push_str("\n## Phase Context\n\n");
        out.push_str(&format!("- Order: {}\n- Name: {}\n- Description: {}\n", phase.order, phase.name, phase.description));
        if !phase.done_definitions.is_empty() {
            out.push_str("- Done Definitions:\n");
            for d in &phase.done_definitions {
                out.push_str(&format!("  - {d}\n"));
            }
        }
        if !phase.additional_notes.is_empty() {
            out.push_str(&format!("- Additional Notes: {}\n", phase.additional_notes));
        }
        if !ctx.cross_phase_summaries.is_empty() {
            out.push_str("- Cross-Phase Summaries:\n");
            for s in &ctx.cross_phase_summaries {
                out.push_str(&format!("  - {s}\n"));
            }
        }
    }

    if !ctx.memory_snippets.is_empty() {
        out.push_str("\n## Relevant Memories\n\n");
        for m in &ctx.memory_snippets {
            out.push_str(&format!("- {m}\n"));
        }
    }

    out.push_str("\n## Available Tools\n\n");
    for tool in TOOL_CONTRACT {
        out.push_str(&format!("- {tool}\n"));
    }

    out.push_str("\n## Communication\n\n");
    out.push_str("Use `save_memory` to persist discoveries and fixes for future agents. ");
    out.push_str("Broadcasts appear to other agents as `[AGENT <src> BROADCAST]: ...`; ");
    out.push_str("direct messages appear as `[AGENT <src> TO AGENT <dst>]: ...`. ");
    out.push_str("Call `update_task_status` with status=done or status=failed when finished.\n");

    out
}

/// Fallback prompt for validator/diagnostic agents when the enrichment
/// pipeline produced none: a minimal prompt naming the role.
pub fn render_role_fallback_prompt(role: &str, task_id: uuid::Uuid) -> String {
    format!("You are acting as a {role} agent for task {task_id}. Review the work in this worktree and report your verdict via the validation tool contract.")
}
