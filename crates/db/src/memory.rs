//! In-memory collaborator fakes for router and handler tests, mirroring the
//! production seams without touching sqlite.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use urbanbot_core::collab::{DataStore, KnowledgeChunk, KnowledgeStore};
use urbanbot_core::record::Record;

/// Replays canned result sets in order and records every SQL statement it
/// was asked to run.
#[derive(Default)]
pub struct InMemoryDataStore {
    responses: Mutex<VecDeque<Vec<Record>>>,
    executed: Mutex<Vec<String>>,
}

impl InMemoryDataStore {
    pub fn with_responses(responses: Vec<Vec<Record>>) -> Self {
        Self { responses: Mutex::new(responses.into()), executed: Mutex::new(Vec::new()) }
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn query(&self, sql: &str) -> Result<Vec<Record>> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        let next = self.responses.lock().ok().and_then(|mut queue| queue.pop_front());
        Ok(next.unwrap_or_default())
    }
}

/// A store that must never be reached. Tests assert `was_queried()` stays
/// false on guarded paths.
#[derive(Default)]
pub struct RejectingDataStore {
    queried: AtomicBool,
}

impl RejectingDataStore {
    pub fn was_queried(&self) -> bool {
        self.queried.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataStore for RejectingDataStore {
    async fn query(&self, sql: &str) -> Result<Vec<Record>> {
        self.queried.store(true, Ordering::SeqCst);
        Err(anyhow!("data store must not be reached for this request: {sql}"))
    }
}

/// Fixed chunk set per optional domain tag; ignores the embedding and
/// returns the first `k` matches.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    chunks: Vec<(Option<String>, KnowledgeChunk)>,
}

impl InMemoryKnowledgeStore {
    pub fn with_chunks(chunks: Vec<(Option<String>, KnowledgeChunk)>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn top_chunks(
        &self,
        _embedding: &[f32],
        domain: Option<&str>,
        k: usize,
    ) -> Result<Vec<KnowledgeChunk>> {
        let matches = self
            .chunks
            .iter()
            .filter(|(tag, _)| match (tag, domain) {
                (Some(tag), Some(domain)) => tag == domain,
                (None, _) => true,
                (Some(_), None) => true,
            })
            .map(|(_, chunk)| chunk.clone())
            .take(k)
            .collect();
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use urbanbot_core::collab::DataStore;
    use urbanbot_core::record::Record;

    use super::{InMemoryDataStore, RejectingDataStore};

    #[tokio::test]
    async fn in_memory_store_replays_responses_in_order() {
        let first = vec![Record::new(vec![("aqi".to_string(), json!(142))])];
        let store = InMemoryDataStore::with_responses(vec![first.clone(), Vec::new()]);

        assert_eq!(store.query("SELECT 1").await.expect("first query"), first);
        assert!(store.query("SELECT 2").await.expect("second query").is_empty());
        assert_eq!(store.executed_sql(), vec!["SELECT 1", "SELECT 2"]);
    }

    #[tokio::test]
    async fn rejecting_store_flags_any_access() {
        let store = RejectingDataStore::default();
        assert!(!store.was_queried());
        assert!(store.query("SELECT 1").await.is_err());
        assert!(store.was_queried());
    }
}
