//! Civic email drafting and dispatch. Drafting and sending are separate
//! stages so a follow-up "send it" can reuse an existing draft without a
//! second generation call.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use urbanbot_core::{DomainScope, Envelope, LlmClient, Mailer, RouterError};

use crate::guard;

use super::Handler;

const DEFAULT_SUBJECT: &str = "Civic Issue Report";

/// Only these exact phrasings dispatch; anything else stays a draft.
const SEND_PHRASES: &[&str] = &[
    "send this mail",
    "send the mail",
    "send email",
    "email it",
    "forward this",
    "send a mail",
    "send it",
    "send a email",
];

pub fn wants_send(utterance: &str) -> bool {
    let lowered = utterance.to_lowercase();
    SEND_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

fn drafting_prompt(utterance: &str) -> String {
    format!(
        "You are a Smart City civic email assistant.\n\n\
         Your task is to draft formal emails ONLY for Smart City related civic issues.\n\n\
         Allowed topics:\n\
         - traffic congestion\n\
         - road accidents\n\
         - air quality problems\n\
         - crowd management\n\
         - public infrastructure issues\n\
         - system/service alerts\n\
         - citizen complaints about city services\n\
         - water supply issues\n\
         - drainage blockage\n\
         - sewage overflow\n\
         - pipeline leakage\n\n\
         If the user request is NOT related to Smart City services,\n\
         respond ONLY with:\n\
         I can send emails only for Smart City related services.\n\n\
         Do NOT write any email in that case.\n\n\
         Email Rules:\n\
         - The sender is a citizen (NOT an admin)\n\
         - Do NOT add any name unless provided\n\
         - Do NOT add placeholders like [Your Name], [Name]\n\
         - Keep the tone formal, realistic, and polite\n\
         - Use ONLY the details provided in the user request\n\
         - Do NOT create or assume any location, street name, or city\n\
         - If location is not given, refer to it as \"my area\"\n\
         - Do NOT create imaginary facts\n\
         - End naturally without designation\n\
         - Return the email in plain text only\n\
         - Do NOT use HTML, markdown, or code blocks\n\
         - If the user mentions a name in the request, you MUST use that exact name \
           at the end of the email\n\
         - Do NOT write notes like \"no name provided\"\n\
         - If no name is mentioned, simply end the email naturally like Thank You\n\n\
         Format:\n\n\
         Subject: <short subject>\n\n\
         <email body>\n\n\
         User request:\n{utterance}\n"
    )
}

/// A generated email, split into its subject line and body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

impl EmailDraft {
    /// Split model output at the `Subject:` marker line; without one the
    /// whole text is the body under the default subject.
    fn parse(content: &str) -> Self {
        let mut subject = DEFAULT_SUBJECT.to_string();
        let mut body = content.trim().to_string();

        let lines: Vec<&str> = content.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            if line.trim().to_lowercase().starts_with("subject") {
                if let Some((_, value)) = line.split_once(':') {
                    subject = value.trim().to_string();
                    body = lines[index + 1..].join("\n").trim().to_string();
                }
                break;
            }
        }

        Self { subject, body }
    }
}

pub struct EmailHandler {
    llm: Arc<dyn LlmClient>,
    mailer: Arc<dyn Mailer>,
}

impl EmailHandler {
    pub fn new(llm: Arc<dyn LlmClient>, mailer: Arc<dyn Mailer>) -> Self {
        Self { llm, mailer }
    }

    /// Generate a draft for the request. Fails with the email-scope
    /// refusal when either the keyword gate or the model's own topic
    /// check rejects the request.
    pub async fn draft(&self, utterance: &str) -> Result<EmailDraft, RouterError> {
        if !guard::is_civic_email_topic(utterance) {
            return Err(RouterError::OutOfDomain(DomainScope::Email));
        }

        let content = self
            .llm
            .complete(&drafting_prompt(utterance))
            .await
            .map_err(RouterError::upstream)?;
        let content = content.trim();

        // The prompt instructs the model to answer with the refusal line
        // instead of an email for off-topic requests.
        if content
            .to_lowercase()
            .starts_with("i can send emails only")
        {
            return Err(RouterError::OutOfDomain(DomainScope::Email));
        }

        Ok(EmailDraft::parse(content))
    }

    /// Hand an existing draft to the mailer. Failures are reported to the
    /// caller; there is no silent retry.
    pub async fn dispatch(&self, draft: &EmailDraft) -> Result<Envelope, RouterError> {
        match self.mailer.send(&draft.subject, &draft.body).await {
            Ok(()) => {
                info!(event_name = "email_dispatched", subject = %draft.subject);
                Ok(Envelope::text(format!(
                    "Email sent successfully\n\nSubject: {}\n\n{}",
                    draft.subject, draft.body
                )))
            }
            Err(error) => {
                warn!(event_name = "email_dispatch_failed", error = %error);
                Err(RouterError::upstream(error))
            }
        }
    }
}

#[async_trait]
impl Handler for EmailHandler {
    async fn handle(&self, utterance: &str) -> Result<Envelope, RouterError> {
        let draft = self.draft(utterance).await?;

        if wants_send(utterance) {
            return self.dispatch(&draft).await;
        }

        Ok(Envelope::text(format!(
            "Email Draft\n\nSubject: {}\n\n{}",
            draft.subject, draft.body
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;
    use urbanbot_core::{LlmClient, Mailer, RouterError};

    use super::{wants_send, EmailDraft, EmailHandler, Handler};

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

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, subject: &str, body: &str) -> Result<()> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((subject.to_string(), body.to_string()));
            }
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _subject: &str, _body: &str) -> Result<()> {
            anyhow::bail!("relay rejected the message")
        }
    }

    const DRAFT_OUTPUT: &str = "Subject: Streetlight outage in my area\n\n\
        Dear Sir or Madam,\n\nThe streetlight near my area has been out for \
        three nights.\n\nThank you";

    #[test]
    fn send_phrases_are_explicit() {
        assert!(wants_send("please send this mail now"));
        assert!(wants_send("ok, email it"));
        assert!(!wants_send("draft a mail about the streetlight"));
    }

    #[test]
    fn subject_marker_splits_the_draft() {
        let draft = EmailDraft::parse(DRAFT_OUTPUT);
        assert_eq!(draft.subject, "Streetlight outage in my area");
        assert!(draft.body.starts_with("Dear Sir or Madam,"));
        assert!(draft.body.ends_with("Thank you"));
    }

    #[test]
    fn missing_subject_falls_back_to_default() {
        let draft = EmailDraft::parse("Dear Sir or Madam,\n\nThank you");
        assert_eq!(draft.subject, "Civic Issue Report");
        assert_eq!(draft.body, "Dear Sir or Madam,\n\nThank you");
    }

    #[tokio::test]
    async fn off_topic_request_is_refused_before_any_model_call() {
        let llm = Arc::new(ScriptedLlm::new(DRAFT_OUTPUT));
        let handler = EmailHandler::new(llm.clone(), Arc::new(RecordingMailer::default()));

        let error = handler
            .handle("write an email to my landlord about rent")
            .await
            .unwrap_err();

        assert_eq!(
            error.user_message(),
            "I can send emails only for Smart City related services."
        );
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_refusal_line_maps_to_the_same_scope_error() {
        let llm = Arc::new(ScriptedLlm::new(
            "I can send emails only for Smart City related services.",
        ));
        // Passes the keyword gate ("water") but the model judges it off-topic.
        let handler = EmailHandler::new(llm, Arc::new(RecordingMailer::default()));
        let error = handler
            .handle("email about my aquarium water heater")
            .await
            .unwrap_err();
        assert!(matches!(error, RouterError::OutOfDomain(_)));
    }

    #[tokio::test]
    async fn drafting_does_not_send() {
        let mailer = Arc::new(RecordingMailer::default());
        let handler = EmailHandler::new(Arc::new(ScriptedLlm::new(DRAFT_OUTPUT)), mailer.clone());

        let envelope = handler
            .handle("draft a mail about the broken streetlight")
            .await
            .expect("drafts");

        let text = envelope.as_text().expect("text envelope");
        assert!(text.starts_with("Email Draft"));
        assert!(text.contains("Subject: Streetlight outage in my area"));
        assert!(mailer.sent.lock().expect("sent").is_empty());
    }

    #[tokio::test]
    async fn send_phrase_dispatches_the_draft() {
        let mailer = Arc::new(RecordingMailer::default());
        let handler = EmailHandler::new(Arc::new(ScriptedLlm::new(DRAFT_OUTPUT)), mailer.clone());

        let envelope = handler
            .handle("send this mail about the broken streetlight")
            .await
            .expect("sends");

        let sent = mailer.sent.lock().expect("sent").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Streetlight outage in my area");
        assert!(envelope.as_text().expect("text").starts_with("Email sent successfully"));
    }

    #[tokio::test]
    async fn dispatch_reuses_a_prior_draft_without_regenerating() {
        let llm = Arc::new(ScriptedLlm::new(DRAFT_OUTPUT));
        let mailer = Arc::new(RecordingMailer::default());
        let handler = EmailHandler::new(llm.clone(), mailer.clone());

        let draft = handler
            .draft("draft a mail about the broken streetlight")
            .await
            .expect("drafts");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        handler.dispatch(&draft).await.expect("sends");

        assert_eq!(llm.calls.load(Ordering::SeqCst), 1, "no second generation call");
        assert_eq!(mailer.sent.lock().expect("sent").len(), 1);
    }

    #[tokio::test]
    async fn send_failure_is_reported_not_retried() {
        let handler =
            EmailHandler::new(Arc::new(ScriptedLlm::new(DRAFT_OUTPUT)), Arc::new(FailingMailer));

        let error = handler
            .handle("send this mail about the broken streetlight")
            .await
            .unwrap_err();

        assert!(matches!(error, RouterError::UpstreamUnavailable(_)));
    }
}
