//! Strategy advice. Pure constrained completion, no data store: the
//! model answers from operational expertise, scoped hard to the city
//! domain by the prompt itself.

use std::sync::Arc;

use async_trait::async_trait;
use urbanbot_core::{Envelope, LlmClient, RouterError};

use super::Handler;

pub struct AdvisoryHandler {
    llm: Arc<dyn LlmClient>,
}

impl AdvisoryHandler {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

fn advisory_prompt(utterance: &str) -> String {
    format!(
        "You are a Smart City operations expert assisting city administrators.\n\n\
         Your scope is LIMITED to Smart City domains:\n\
         traffic management, air quality, accidents, crowd control, pothole,\n\
         public infrastructure, and citizen services.\n\n\
         If the request is outside Smart City operations,\n\
         reply with:\n\
         \"I can provide strategies only for Smart City operational areas.\"\n\n\
         Provide concise and practical strategies for the following request:\n\n\
         {utterance}\n\n\
         Rules:\n\
         - Focus on operational and implementable measures\n\
         - Use bullet points\n\
         - Keep it short\n\
         - No greetings\n\
         - No database references\n\
         - Do NOT answer outside Smart City context\n"
    )
}

#[async_trait]
impl Handler for AdvisoryHandler {
    async fn handle(&self, utterance: &str) -> Result<Envelope, RouterError> {
        let answer = self
            .llm
            .complete(&advisory_prompt(utterance))
            .await
            .map_err(RouterError::upstream)?;
        Ok(Envelope::text(answer.trim().to_string()))
    }
}
