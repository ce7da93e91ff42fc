//! Contracts for the external collaborators the router depends on. All of
//! them are untrusted I/O boundaries: model output is adversarial input to
//! the guard layer, never trusted SQL or trusted prose.

use anyhow::Result;
use async_trait::async_trait;

use crate::record::Record;

/// Language-model service. Implementations must pin deterministic sampling
/// (temperature 0) so the classification and synthesis paths stay
/// reproducible.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Read-only query execution against the relational store. The router
/// issues only single-statement SELECTs through this seam; write paths
/// belong to the excluded ingestion code.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<Record>>;
}

/// One retrievable knowledge chunk with its similarity score.
#[derive(Clone, Debug, PartialEq)]
pub struct KnowledgeChunk {
    pub text_chunk: String,
    pub source_reference: String,
    pub score: f32,
}

/// Vector retrieval over the knowledge base, optionally narrowed to a
/// detected sub-domain (`traffic`, `air_quality`, ...).
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn top_chunks(
        &self,
        embedding: &[f32],
        domain: Option<&str>,
        k: usize,
    ) -> Result<Vec<KnowledgeChunk>>;
}

/// Object storage. Exchanges an internal stored reference for a
/// time-limited retrieval URL (expiry on the order of one hour).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn sign_url(&self, stored_reference: &str) -> Result<String>;
}

/// Outbound notification channel. The recipient is fixed by configuration;
/// failures are reported to the caller, never retried silently.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}
