use thiserror::Error;

/// Which guardrail vocabulary rejected the utterance. Each scope carries its
/// own fixed refusal because the email gate uses a broader civic vocabulary
/// than the data/knowledge gates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainScope {
    Data,
    Knowledge,
    Email,
}

/// Router failure taxonomy. Every member maps to a fixed, user-legible
/// message; raw transport detail stays in the error for operator logs and
/// never reaches the end user.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("utterance outside the smart-city domain ({0:?})")]
    OutOfDomain(DomainScope),
    #[error("destructive request blocked")]
    DestructiveRequestBlocked,
    #[error("model produced an invalid query: {0}")]
    SynthesisInvalid(String),
    #[error("no matching records: {0}")]
    NoData(String),
    #[error("upstream dependency unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("no capability matched the request")]
    AmbiguousRequest,
}

impl RouterError {
    pub fn upstream(error: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable(error.to_string())
    }

    /// The message shown to the end user. Stable strings: dashboards and
    /// tests match on them.
    pub fn user_message(&self) -> String {
        match self {
            Self::OutOfDomain(DomainScope::Data) => {
                "I can answer only Smart City data questions.".to_string()
            }
            Self::OutOfDomain(DomainScope::Knowledge) => {
                "I can answer only Smart City knowledge queries.".to_string()
            }
            Self::OutOfDomain(DomainScope::Email) => {
                "I can send emails only for Smart City related services.".to_string()
            }
            Self::DestructiveRequestBlocked => {
                "Destructive operations are not allowed. I support only read-only \
                 Smart City data queries."
                    .to_string()
            }
            Self::SynthesisInvalid(_) => {
                "I can answer only Smart City data questions.".to_string()
            }
            Self::NoData(message) => message.clone(),
            Self::UpstreamUnavailable(_) => {
                "A Smart City service is temporarily unavailable. Please try again shortly."
                    .to_string()
            }
            Self::AmbiguousRequest => {
                "I can help only with Smart City data insights, reports, and drafting \
                 official emails."
                    .to_string()
            }
        }
    }

    /// Guard-stage errors are terminal: the router must not attempt
    /// synthesis or execution after one fires.
    pub fn is_terminal_guard(&self) -> bool {
        matches!(self, Self::OutOfDomain(_) | Self::DestructiveRequestBlocked)
    }
}
