//! VectorStore (S2): an opaque similarity-search seam used by task
//! deduplication and ticket hybrid search.
//!
//! The default implementation is in-process and in-memory; a real vector
//! database is reached through the same trait, configured via `qdrant_url`.
//! Callers only depend on [`VectorStore`], so swapping the backend never
//! touches `hp-queue`/`hp-tickets`.

use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: Uuid,
    pub embedding: Vec<f32>,
    /// Opaque scope tag (e.g. a phase id or workflow id) records are
    /// partitioned by, so a search can be scoped without a second index.
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct ScoredMatch {
    pub id: Uuid,
    pub score: f32,
}

/// Similarity search over stored embeddings, scoped by an opaque partition
/// key (phase id for task dedup, workflow id for ticket search).
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, id: Uuid, scope: &str, embedding: Vec<f32>);

    async fn remove(&self, id: Uuid);

    /// Returns the `limit` closest records within `scope` by cosine
    /// similarity, highest score first.
    async fn search(&self, scope: &str, embedding: &[f32], limit: usize) -> Vec<ScoredMatch>;
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// In-process vector store backing task dedup and ticket search by default.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, id: Uuid, scope: &str, embedding: Vec<f32>) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = records.iter_mut().find(|r| r.id == id) {
            existing.embedding = embedding;
            existing.scope = scope.to_string();
        } else {
            records.push(VectorRecord { id, embedding, scope: scope.to_string() });
        }
    }

    async fn remove(&self, id: Uuid) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.retain(|r| r.id != id);
    }

    async fn search(&self, scope: &str, embedding: &[f32], limit: usize) -> Vec<ScoredMatch> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<ScoredMatch> = records
            .iter()
            .filter(|r| r.scope == scope)
            .map(|r| ScoredMatch { id: r.id, score: cosine_similarity(embedding, &r.embedding) })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }
}
