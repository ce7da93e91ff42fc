//! Fact-query pipeline: guard, synthesize, execute, shape. The only
//! handler that runs model-produced SQL, so both guard stages sit in
//! front of the store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use urbanbot_core::{
    DataStore, DomainScope, Envelope, LlmClient, ObjectStore, RouterError,
};

use crate::{guard, shape, synth};

use super::Handler;

pub struct DatabaseHandler {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn DataStore>,
    storage: Arc<dyn ObjectStore>,
}

impl DatabaseHandler {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn DataStore>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self { llm, store, storage }
    }
}

#[async_trait]
impl Handler for DatabaseHandler {
    async fn handle(&self, utterance: &str) -> Result<Envelope, RouterError> {
        // The raw utterance is checked before any model call; the
        // synthesized SQL is checked again inside synthesize().
        if guard::is_destructive(utterance) {
            return Err(RouterError::DestructiveRequestBlocked);
        }
        if !guard::is_in_domain(utterance) {
            return Err(RouterError::OutOfDomain(DomainScope::Data));
        }

        let sql = synth::synthesize(self.llm.as_ref(), utterance).await?;
        debug!(event_name = "db_query_synthesized", sql = %sql);

        let records = self
            .store
            .query(&sql)
            .await
            .map_err(RouterError::upstream)?;
        debug!(event_name = "db_query_executed", rows = records.len());

        shape::shape(self.llm.as_ref(), self.storage.as_ref(), utterance, &records).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use urbanbot_core::{LlmClient, ObjectStore, Record, RouterError};
    use urbanbot_db::memory::{InMemoryDataStore, RejectingDataStore};

    use super::{DatabaseHandler, Handler};

    struct ScriptedLlm {
        completion: String,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(completion: &str) -> Self {
            Self { completion: completion.to_string(), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.completion.clone())
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }
    }

    struct NoopSigner;

    #[async_trait]
    impl ObjectStore for NoopSigner {
        async fn sign_url(&self, stored_reference: &str) -> Result<String> {
            Ok(format!("{stored_reference}?signature=test"))
        }
    }

    #[tokio::test]
    async fn destructive_utterance_never_reaches_the_store() {
        let llm = Arc::new(ScriptedLlm::new("SELECT 1;"));
        let store = Arc::new(RejectingDataStore::default());
        let handler = DatabaseHandler::new(llm.clone(), store.clone(), Arc::new(NoopSigner));

        let error = handler
            .handle("delete all traffic records")
            .await
            .unwrap_err();

        assert_eq!(error, RouterError::DestructiveRequestBlocked);
        assert!(!store.was_queried());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0, "guard fires before synthesis");
    }

    #[tokio::test]
    async fn out_of_domain_utterance_is_refused_without_a_model_call() {
        let llm = Arc::new(ScriptedLlm::new("SELECT 1;"));
        let store = Arc::new(RejectingDataStore::default());
        let handler = DatabaseHandler::new(llm.clone(), store.clone(), Arc::new(NoopSigner));

        let error = handler.handle("show me the cricket scores").await.unwrap_err();

        assert!(error.is_terminal_guard());
        assert!(!store.was_queried());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn destructive_synthesis_is_blocked_after_generation() {
        let llm = Arc::new(ScriptedLlm::new("DROP TABLE traffic_data;"));
        let store = Arc::new(RejectingDataStore::default());
        let handler = DatabaseHandler::new(llm, store.clone(), Arc::new(NoopSigner));

        let error = handler.handle("latest traffic levels").await.unwrap_err();

        assert_eq!(error, RouterError::DestructiveRequestBlocked);
        assert!(!store.was_queried());
    }

    #[tokio::test]
    async fn happy_path_executes_the_sanitized_query_and_shapes_the_rows() {
        let llm = Arc::new(ScriptedLlm::new(
            "```sql\nSELECT city, aqi FROM air_quality_data ORDER BY timestamp DESC LIMIT 2;\n```",
        ));
        let store = Arc::new(InMemoryDataStore::with_responses(vec![vec![
            Record::new(vec![("city".to_string(), json!("Salem")), ("aqi".to_string(), json!(92))]),
            Record::new(vec![("city".to_string(), json!("Erode")), ("aqi".to_string(), json!(55))]),
        ]]));
        let handler = DatabaseHandler::new(llm, store.clone(), Arc::new(NoopSigner));

        let envelope = handler.handle("latest aqi readings").await.expect("routes");

        assert_eq!(
            store.executed_sql(),
            vec!["SELECT city, aqi FROM air_quality_data ORDER BY timestamp DESC LIMIT 2;"]
        );
        assert_eq!(envelope.as_text(), Some("city: Salem | aqi: 92\ncity: Erode | aqi: 55"));
    }

    #[tokio::test]
    async fn empty_result_yields_the_domain_no_data_message() {
        let llm = Arc::new(ScriptedLlm::new(
            "SELECT COUNT(*) AS accident_count FROM accident_events;",
        ));
        let store = Arc::new(InMemoryDataStore::with_responses(vec![vec![]]));
        let handler = DatabaseHandler::new(llm, store, Arc::new(NoopSigner));

        let error = handler.handle("how many accidents today").await.unwrap_err();
        assert_eq!(error.user_message(), "No accidents detected so far.");
    }
}
