//! TicketService: data-driven ticket status machine, blocking propagation,
//! hybrid search, and the clarification arbitrator.

use std::sync::Arc;

use hp_core::store::Store;
use hp_core::types::{ApprovalStatus, BoardConfig, Ticket, TicketComment, TicketCommit, TicketHistory};
use hp_intelligence::capability::IntelligenceProvider;
use hp_intelligence::vector_store::VectorStore;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TicketServiceError {
    #[error("store error: {0}")]
    Store(#[from] hp_core::store::StoreError),
    #[error("intelligence error: {0}")]
    Intelligence(#[from] hp_intelligence::capability::CapabilityError),
    #[error("ticket {0} not found")]
    TicketNotFound(Uuid),
    #[error("board config for workflow {0} not found")]
    BoardNotFound(Uuid),
    #[error("transition refused: ticket is blocked by {0:?}")]
    Blocked(Vec<Uuid>),
    #[error("transition refused: ticket is pending human review")]
    PendingReview,
}

pub type Result<T> = std::result::Result<T, TicketServiceError>;

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub ticket: Ticket,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub ticket: Ticket,
    pub relevance_score: f64,
    pub matched_in: Vec<String>,
    pub preview: String,
}

const SEMANTIC_WEIGHT: f64 = 0.7;
const FULLTEXT_WEIGHT: f64 = 0.3;

pub struct TicketService {
    store: Arc<Store>,
    intelligence: Arc<dyn IntelligenceProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl TicketService {
    pub fn new(store: Arc<Store>, intelligence: Arc<dyn IntelligenceProvider>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self { store, intelligence, vector_store }
    }

    /// Create a ticket. With human review enabled on the board, the ticket
    /// starts `pending_review`; otherwise it is auto-approved.
    pub async fn create_ticket(&self, mut ticket: Ticket) -> Result<Ticket> {
        let board = self.store.get_board_config(ticket.workflow_id).await?.ok_or(TicketServiceError::BoardNotFound(ticket.workflow_id))?;
        ticket.approval_status = if board.ticket_human_review { ApprovalStatus::PendingReview } else { ApprovalStatus::AutoApproved };

        if let Some(embedding_text) = Some(format!("{} {}", ticket.title, ticket.description)) {
            let embedding = self.intelligence.generate_embedding(&embedding_text).await?;
            self.vector_store.upsert(ticket.id, &ticket.workflow_id.to_string(), embedding.clone()).await;
            ticket.embedding = Some(embedding);
        }

        self.store.upsert_ticket(&ticket).await?;
        self.store
            .insert_ticket_history(&TicketHistory {
                id: Uuid::new_v4(),
                ticket_id: ticket.id,
                change_type: "created".into(),
                old_value: None,
                new_value: Some(json!({ "status": ticket.status, "approval_status": format!("{:?}", ticket.approval_status) })),
                description: format!("Ticket '{}' created", ticket.title),
                created_at: chrono::Utc::now(),
            })
            .await?;
        info!(ticket_id = %ticket.id, "ticket created");
        Ok(ticket)
    }

    /// Approve/reject a pending-review ticket.
    pub async fn set_approval_status(&self, ticket_id: Uuid, approved: bool) -> Result<Ticket> {
        let mut ticket = self.store.get_ticket(ticket_id).await?.ok_or(TicketServiceError::TicketNotFound(ticket_id))?;
        let old = format!("{:?}", ticket.approval_status);
        ticket.approval_status = if approved { ApprovalStatus::Approved } else { ApprovalStatus::Rejected };
        ticket.updated_at = chrono::Utc::now();
        self.store.upsert_ticket(&ticket).await?;
        self.store
            .insert_ticket_history(&TicketHistory {
                id: Uuid::new_v4(),
                ticket_id,
                change_type: "approval_status_changed".into(),
                old_value: Some(json!(old)),
                new_value: Some(json!(format!("{:?}", ticket.approval_status))),
                description: format!("Approval status changed to {:?}", ticket.approval_status),
                created_at: chrono::Utc::now(),
            })
            .await?;
        Ok(ticket)
    }

    /// Any column-to-column transition is legal unless the ticket is
    /// blocked or pending human review.
    pub async fn transition_status(&self, ticket_id: Uuid, new_status: &str, commit_sha: Option<String>) -> Result<TransitionOutcome> {
        let mut ticket = self.store.get_ticket(ticket_id).await?.ok_or(TicketServiceError::TicketNotFound(ticket_id))?;
        let board = self.store.get_board_config(ticket.workflow_id).await?.ok_or(TicketServiceError::BoardNotFound(ticket.workflow_id))?;

        if !ticket.blocked_by_ticket_ids.is_empty() {
            let blockers = self.store.get_tickets_by_ids(&ticket.blocked_by_ticket_ids).await?;
            let unresolved: Vec<Uuid> = blockers.iter().filter(|b| !b.is_resolved).map(|b| b.id).collect();
            if !unresolved.is_empty() {
                return Err(TicketServiceError::Blocked(unresolved));
            }
        }
        if board.ticket_human_review && ticket.approval_status != ApprovalStatus::Approved {
            return Err(TicketServiceError::PendingReview);
        }

        let old_status = ticket.status.clone();
        ticket.status = new_status.to_string();
        ticket.is_resolved = board.columns.last().map(|c| c.as_str() == new_status).unwrap_or(false);
        ticket.updated_at = chrono::Utc::now();
        self.store.upsert_ticket(&ticket).await?;

        if let Some(sha) = commit_sha {
            self.store.insert_ticket_commit(&TicketCommit { id: Uuid::new_v4(), ticket_id, commit_sha: sha, created_at: chrono::Utc::now() }).await?;
        }

        self.store
            .insert_ticket_history(&TicketHistory {
                id: Uuid::new_v4(),
                ticket_id,
                change_type: "status_changed".into(),
                old_value: Some(json!(old_status)),
                new_value: Some(json!(new_status)),
                description: format!("Status changed from {old_status} to {new_status}"),
                created_at: chrono::Utc::now(),
            })
            .await?;

        if ticket.is_resolved {
            self.propagate_unblock(ticket_id).await?;
        }

        Ok(TransitionOutcome { ticket })
    }

    /// On resolve: find tickets blocked by this one, remove it from their
    /// `blocked_by_ticket_ids`, and return the unblocked list.
    async fn propagate_unblock(&self, resolved_ticket_id: Uuid) -> Result<Vec<Uuid>> {
        let recent = self.store.list_recent_tickets(500).await?;
        let mut unblocked = Vec::new();
        for mut candidate in recent {
            if candidate.blocked_by_ticket_ids.contains(&resolved_ticket_id) {
                candidate.blocked_by_ticket_ids.retain(|id| *id != resolved_ticket_id);
                candidate.updated_at = chrono::Utc::now();
                self.store.upsert_ticket(&candidate).await?;
                unblocked.push(candidate.id);
            }
        }
        if !unblocked.is_empty() {
            info!(resolved_ticket_id = %resolved_ticket_id, count = unblocked.len(), "tickets unblocked");
        }
        Ok(unblocked)
    }

    /// Hybrid search: 70% semantic similarity (embedding cosine), 30%
    /// full-text (FTS5 `bm25`), merged by a reciprocal-rank-fusion-like
    /// weighting.
    pub async fn hybrid_search(&self, workflow_id: Uuid, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let embedding = self.intelligence.generate_embedding(query).await?;
        let semantic = self.vector_store.search(&workflow_id.to_string(), &embedding, limit * 2).await;
        let fulltext = self.store.search_tickets_fulltext(workflow_id, query, (limit * 2) as i64).await?;

        let max_bm25 = fulltext.iter().map(|(_, rank)| rank.abs()).fold(1.0_f64, f64::max);

        let mut scored: std::collections::HashMap<Uuid, (Ticket, f64, Vec<String>)> = std::collections::HashMap::new();
        for m in semantic {
            if let Some(ticket) = self.store.get_ticket(m.id).await? {
                scored.insert(m.id, (ticket, SEMANTIC_WEIGHT * m.score as f64, vec!["semantic".to_string()]));
            }
        }
        for (ticket, rank) in fulltext {
            let normalized = 1.0 - (rank.abs() / max_bm25).min(1.0);
            let entry = scored.entry(ticket.id).or_insert_with(|| (ticket.clone(), 0.0, Vec::new()));
            entry.1 += FULLTEXT_WEIGHT * normalized;
            entry.2.push("fulltext".to_string());
        }

        let mut hits: Vec<SearchHit> = scored
            .into_values()
            .map(|(ticket, score, matched_in)| {
                let preview = ticket.description.chars().take(160).collect::<String>();
                SearchHit { ticket, relevance_score: score, matched_in, preview }
            })
            .collect();
        hits.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Gather up to 60 recent tickets and 60 recent tasks as context, ask
    /// the intelligence provider for a markdown resolution, and persist it
    /// as a `clarification` comment for audit.
    pub async fn resolve_clarification(
        &self,
        ticket_id: Uuid,
        conflict_description: &str,
        potential_solutions: &[String],
    ) -> Result<String> {
        let ticket = self.store.get_ticket(ticket_id).await?.ok_or(TicketServiceError::TicketNotFound(ticket_id))?;
        let recent_tickets = self.store.list_recent_tickets(60).await?;
        let recent_tasks = self.store.list_recent_tasks(60).await?;

        let context = format!(
            "Recent tickets: {}\nRecent tasks: {}",
            recent_tickets.iter().map(|t| t.title.clone()).collect::<Vec<_>>().join("; "),
            recent_tasks.iter().map(|t| t.raw_description.clone()).collect::<Vec<_>>().join("; ")
        );

        let resolution = self
            .intelligence
            .resolve_ticket_clarification(&ticket, conflict_description, &context, potential_solutions)
            .await?;

        self.store
            .insert_ticket_comment(&TicketComment {
                id: Uuid::new_v4(),
                ticket_id,
                author_agent_id: None,
                comment_text: resolution.clone(),
                comment_type: "clarification".into(),
                created_at: chrono::Utc::now(),
            })
            .await?;

        info!(%ticket_id, "clarification resolved and recorded");
        Ok(resolution)
    }

    pub async fn get_board_config(&self, workflow_id: Uuid) -> Result<Option<BoardConfig>> {
        Ok(self.store.get_board_config(workflow_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_core::types::TaskPriority;
    use hp_intelligence::capability::DeterministicProvider;
    use hp_intelligence::vector_store::InMemoryVectorStore;

    fn service(store: Arc<Store>) -> TicketService {
        TicketService::new(store, Arc::new(DeterministicProvider), Arc::new(InMemoryVectorStore::new()))
    }

    async fn board(store: &Store, workflow_id: Uuid, human_review: bool) {
        store
            .upsert_board_config(&BoardConfig {
                workflow_id,
                columns: vec!["todo".into(), "in_progress".into(), "done".into()],
                allowed_types: vec!["bug".into(), "feature".into()],
                initial_status: "todo".into(),
                ticket_human_review: human_review,
                approval_timeout_seconds: 1800,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn creation_without_human_review_auto_approves() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let workflow_id = Uuid::new_v4();
        board(&store, workflow_id, false).await;
        let svc = service(store);
        let ticket = Ticket::new(workflow_id, "Fix login bug", "desc", "bug", TaskPriority::Medium, "todo", false);
        let created = svc.create_ticket(ticket).await.unwrap();
        assert_eq!(created.approval_status, ApprovalStatus::AutoApproved);
    }

    #[tokio::test]
    async fn creation_with_human_review_is_pending() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let workflow_id = Uuid::new_v4();
        board(&store, workflow_id, true).await;
        let svc = service(store);
        let ticket = Ticket::new(workflow_id, "Fix login bug", "desc", "bug", TaskPriority::Medium, "todo", false);
        let created = svc.create_ticket(ticket).await.unwrap();
        assert_eq!(created.approval_status, ApprovalStatus::PendingReview);
    }

    #[tokio::test]
    async fn transition_refused_while_blocked() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let workflow_id = Uuid::new_v4();
        board(&store, workflow_id, false).await;
        let svc = service(store.clone());

        let blocker = svc.create_ticket(Ticket::new(workflow_id, "Blocker", "d", "bug", TaskPriority::Medium, "todo", false)).await.unwrap();
        let mut blocked = Ticket::new(workflow_id, "Blocked", "d", "bug", TaskPriority::Medium, "todo", false);
        blocked.blocked_by_ticket_ids = vec![blocker.id];
        let blocked = svc.create_ticket(blocked).await.unwrap();

        let err = svc.transition_status(blocked.id, "in_progress", None).await.unwrap_err();
        assert!(matches!(err, TicketServiceError::Blocked(_)));
    }

    #[tokio::test]
    async fn resolving_blocker_unblocks_dependents() {
        let store = Arc::new(Store::new_in_memory().await.unwrap());
        let workflow_id = Uuid::new_v4();
        board(&store, workflow_id, false).await;
        let svc = service(store.clone());

        let blocker = svc.create_ticket(Ticket::new(workflow_id, "Blocker", "d", "bug", TaskPriority::Medium, "todo", false)).await.unwrap();
        let mut blocked = Ticket::new(workflow_id, "Blocked", "d", "bug", TaskPriority::Medium, "todo", false);
        blocked.blocked_by_ticket_ids = vec![blocker.id];
        let blocked = svc.create_ticket(blocked).await.unwrap();

        svc.transition_status(blocker.id, "done", None).await.unwrap();
        let refreshed = store.get_ticket(blocked.id).await.unwrap().unwrap();
        assert!(refreshed.blocked_by_ticket_ids.is_empty());
    }
}
