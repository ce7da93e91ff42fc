//! Orchestration: guard, classify, dispatch, normalize. `route` always
//! produces an envelope; errors collapse to their fixed user messages
//! here and transport detail stays in the logs.

use std::sync::Arc;

use tracing::{debug, warn};
use urbanbot_core::{
    DataStore, DomainScope, Envelope, KnowledgeStore, LlmClient, Mailer, ObjectStore,
    RouterError,
};

use crate::handlers::{
    AdvisoryHandler, DatabaseHandler, EmailHandler, GeneralHandler, Handler, ImageHandler,
    KnowledgeHandler, ReportHandler,
};
use crate::{guard, intent, intent::Intent};

/// Stateless per-utterance router. Every dependency is injected; nothing
/// is retained between calls.
pub struct Dispatcher {
    llm: Arc<dyn LlmClient>,
    general: GeneralHandler,
    database: DatabaseHandler,
    report: ReportHandler,
    email: EmailHandler,
    knowledge: KnowledgeHandler,
    image: ImageHandler,
    advisory: AdvisoryHandler,
}

impl Dispatcher {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn DataStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        storage: Arc<dyn ObjectStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            general: GeneralHandler,
            database: DatabaseHandler::new(llm.clone(), store.clone(), storage.clone()),
            report: ReportHandler::new(llm.clone(), store.clone()),
            email: EmailHandler::new(llm.clone(), mailer),
            knowledge: KnowledgeHandler::new(llm.clone(), knowledge),
            image: ImageHandler::new(llm.clone(), store, storage),
            advisory: AdvisoryHandler::new(llm.clone()),
            llm,
        }
    }

    fn handler_for(&self, intent: Intent) -> &dyn Handler {
        match intent {
            Intent::General => &self.general,
            Intent::Database => &self.database,
            Intent::Report => &self.report,
            Intent::Email => &self.email,
            Intent::Rag => &self.knowledge,
            Intent::Image => &self.image,
            Intent::Advisory => &self.advisory,
        }
    }

    async fn try_route(&self, utterance: &str) -> Result<Envelope, RouterError> {
        // Courtesy chat is answered before the guard and without any model
        // call, but only when the cascade itself lands on the general rule;
        // mixed utterances keep their higher-priority intent.
        if intent::is_courtesy(utterance) {
            return self.general.handle(utterance).await;
        }

        if !guard::is_in_domain(utterance) {
            return Err(RouterError::OutOfDomain(DomainScope::Data));
        }

        let intent = intent::classify(self.llm.as_ref(), utterance).await?;
        debug!(event_name = "utterance_classified", intent = intent.as_str());

        self.handler_for(intent).handle(utterance).await
    }

    /// Route one utterance to its capability handler and normalize the
    /// outcome into an envelope.
    pub async fn route(&self, utterance: &str) -> Envelope {
        match self.try_route(utterance).await {
            Ok(envelope) => envelope,
            Err(error) => {
                if error.is_terminal_guard() {
                    debug!(event_name = "utterance_refused", reason = %error);
                } else {
                    warn!(event_name = "routing_failed", error = %error);
                }
                Envelope::text(error.user_message())
            }
        }
    }
}
