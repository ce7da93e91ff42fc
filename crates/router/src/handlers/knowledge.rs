//! Retrieval-augmented knowledge answers: embed the question, pull the
//! closest chunks, answer strictly from that context.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use urbanbot_core::{
    DomainScope, Envelope, KnowledgeChunk, KnowledgeStore, LlmClient, RouterError,
};

use crate::guard;

use super::Handler;

pub const NO_CHUNKS_MESSAGE: &str = "No relevant Smart City knowledge found.";

const TOP_K: usize = 5;

/// Map the utterance to a knowledge sub-domain tag, narrowing retrieval
/// when one matches. Order matters: "traffic pollution" reads as traffic.
pub fn detect_domain(utterance: &str) -> Option<&'static str> {
    let lowered = utterance.to_lowercase();

    if lowered.contains("traffic") || lowered.contains("congestion") {
        return Some("traffic");
    }
    if lowered.contains("air") || lowered.contains("aqi") || lowered.contains("pollution") {
        return Some("air_quality");
    }
    if lowered.contains("complaint") {
        return Some("complaints");
    }
    if lowered.contains("pothole")
        || lowered.contains("infrastructure")
        || lowered.contains("streetlight")
    {
        return Some("infra");
    }
    if lowered.contains("crowd") || lowered.contains("overcrowd") || lowered.contains("density") {
        return Some("crowd");
    }
    if lowered.contains("accident") || lowered.contains("crash") || lowered.contains("collision") {
        return Some("accident");
    }
    None
}

fn context_prompt(context: &str, utterance: &str) -> String {
    format!(
        "You are a Smart City AI assistant.\n\n\
         Answer using ONLY the provided context.\n\n\
         Rules:\n\
         - Do NOT use external knowledge\n\
         - If the answer is not in the context, say:\n  \
           \"This information is not available in the Smart City knowledge base.\"\n\
         - Keep it concise and factual\n\
         - No greetings\n\
         - No assumptions\n\n\
         Context:\n{context}\n\n\
         Question:\n{utterance}\n"
    )
}

pub struct KnowledgeHandler {
    llm: Arc<dyn LlmClient>,
    knowledge: Arc<dyn KnowledgeStore>,
}

impl KnowledgeHandler {
    pub fn new(llm: Arc<dyn LlmClient>, knowledge: Arc<dyn KnowledgeStore>) -> Self {
        Self { llm, knowledge }
    }
}

#[async_trait]
impl Handler for KnowledgeHandler {
    async fn handle(&self, utterance: &str) -> Result<Envelope, RouterError> {
        if !guard::is_in_domain(utterance) {
            return Err(RouterError::OutOfDomain(DomainScope::Knowledge));
        }

        let domain = detect_domain(utterance);
        let embedding = self
            .llm
            .embed(utterance)
            .await
            .map_err(RouterError::upstream)?;
        let chunks = self
            .knowledge
            .top_chunks(&embedding, domain, TOP_K)
            .await
            .map_err(RouterError::upstream)?;
        debug!(event_name = "knowledge_chunks_retrieved", domain, chunks = chunks.len());

        if chunks.is_empty() {
            return Ok(Envelope::text(NO_CHUNKS_MESSAGE));
        }

        let context = chunks
            .iter()
            .map(|chunk: &KnowledgeChunk| chunk.text_chunk.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let answer = self
            .llm
            .complete(&context_prompt(&context, utterance))
            .await
            .map_err(RouterError::upstream)?;
        Ok(Envelope::text(answer.trim().to_string()))
    }
}
