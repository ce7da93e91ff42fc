use anyhow::Result;
use async_trait::async_trait;
use sqlx::Row;

use urbanbot_core::collab::{KnowledgeChunk, KnowledgeStore};

use crate::store::StoreError;
use crate::DbPool;

/// Knowledge retrieval over `rag_documents`. Embeddings are stored as JSON
/// float arrays and ranked in-process with cosine similarity: a brute-force
/// scan is fine at knowledge-base scale, and it keeps the SQL strictly
/// read-only with bound parameters.
pub struct SqlKnowledgeStore {
    pool: DbPool,
}

impl SqlKnowledgeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_candidates(
        &self,
        domain: Option<&str>,
    ) -> Result<Vec<(String, String, Vec<f32>)>, StoreError> {
        let rows = match domain {
            Some(domain) => {
                sqlx::query(
                    "SELECT text_chunk, source_reference, embedding_vector \
                     FROM rag_documents WHERE source_type = ?",
                )
                .bind(domain)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT text_chunk, source_reference, embedding_vector FROM rag_documents",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|row| {
                let text_chunk: String = row.get("text_chunk");
                let source_reference: String = row.get("source_reference");
                let raw_embedding: String = row.get("embedding_vector");
                let embedding: Vec<f32> = serde_json::from_str(&raw_embedding).map_err(|error| {
                    StoreError::Decode(format!("embedding for `{source_reference}`: {error}"))
                })?;
                Ok((text_chunk, source_reference, embedding))
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for SqlKnowledgeStore {
    async fn top_chunks(
        &self,
        embedding: &[f32],
        domain: Option<&str>,
        k: usize,
    ) -> Result<Vec<KnowledgeChunk>> {
        let candidates = self.fetch_candidates(domain).await?;

        let mut scored = candidates
            .into_iter()
            .map(|(text_chunk, source_reference, candidate)| KnowledgeChunk {
                score: cosine_similarity(embedding, &candidate),
                text_chunk,
                source_reference,
            })
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
