//! Intent classification: a strict ordered cascade of keyword rules with a
//! language-model fallback for genuinely novel phrasing. First matching
//! rule wins; rule order encodes priority ("send me accident data by email"
//! must reach the email handler, not the database handler). Only the
//! fallback is nondeterministic, which keeps every branch testable with
//! literal phrase fixtures.

use urbanbot_core::{LlmClient, RouterError};

/// The capability selected for an utterance. Produced once, never
/// retroactively changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intent {
    General,
    Database,
    Report,
    Email,
    Rag,
    Image,
    Advisory,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Database => "database",
            Self::Report => "report",
            Self::Email => "email",
            Self::Rag => "rag",
            Self::Image => "image",
            Self::Advisory => "advisory",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const EMAIL_TERMS: &[&str] = &[
    "email",
    "mail",
    "send mail",
    "send email",
    "write mail",
    "draft mail",
    "complaint to",
    "send a mail",
    "send a email",
];

pub const ADVISORY_TERMS: &[&str] =
    &["prevent", "reduce", "control", "improve", "solution", "how to"];

const REPORT_TERMS: &[&str] =
    &["report", "summary", "analytics", "city status", "overall", "summarize"];

const RAG_TERMS: &[&str] = &[
    "which area",
    "where",
    "situation",
    "status",
    "analysis",
    "give insights",
    "problem",
    "issue",
];

const IMAGE_TERMS: &[&str] = &["image", "photo", "snapshot", "camera", "cctv"];

const DATABASE_FACT_TERMS: &[&str] = &["how many", "count", "list", "show", "latest", "today"];

const DATABASE_NOUN_TERMS: &[&str] =
    &["accident", "traffic", "aqi", "complaint", "crowd", "infrastructure", "pothole"];

const COURTESY_EXACT: &[&str] =
    &["hi", "hello", "hey", "thanks", "thank you", "ok", "ok thanks", "okay", "cool", "great"];

const COURTESY_PHRASES: &[&str] =
    &["how are you", "who are you", "your name", "what is your name", "bye", "goodbye"];

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

/// Courtesy/general chat needs no model and no domain keyword; the
/// dispatcher checks this before the domain guard. A courtesy substring
/// alone is not enough: every higher-priority rule gets first claim, so
/// "how are you going to reduce congestion" still reaches advisory.
pub fn is_courtesy(utterance: &str) -> bool {
    classify_rules(utterance) == Some(Intent::General)
}

/// The deterministic cascade. `None` means no rule fired and the caller
/// should consult the model fallback.
pub fn classify_rules(utterance: &str) -> Option<Intent> {
    let lowered = utterance.to_lowercase();
    let text = lowered.trim();

    if contains_any(text, EMAIL_TERMS) {
        return Some(Intent::Email);
    }
    if contains_any(text, ADVISORY_TERMS) {
        return Some(Intent::Advisory);
    }
    if contains_any(text, REPORT_TERMS) {
        return Some(Intent::Report);
    }
    if contains_any(text, RAG_TERMS) {
        return Some(Intent::Rag);
    }
    if contains_any(text, IMAGE_TERMS) {
        return Some(Intent::Image);
    }
    if contains_any(text, DATABASE_FACT_TERMS) {
        return Some(Intent::Database);
    }
    if contains_any(text, DATABASE_NOUN_TERMS) {
        return Some(Intent::Database);
    }
    if COURTESY_EXACT.contains(&text) || contains_any(text, COURTESY_PHRASES) {
        return Some(Intent::General);
    }

    None
}

fn fallback_prompt(utterance: &str) -> String {
    format!(
        "Classify the intent into ONE word only:\n\n\
         general\ndatabase\nreport\nemail\nrag\nimage\nadvisory\n\n\
         Query: {utterance}\n"
    )
}

/// Map the model's free-form answer back onto the enumeration. Anything
/// unrecognized defaults to `Database`: a wrong fact lookup is recoverable,
/// a wrong refusal is not.
fn parse_fallback_answer(answer: &str) -> Intent {
    let lowered = answer.to_lowercase();
    if lowered.contains("email") {
        Intent::Email
    } else if lowered.contains("advisory") {
        Intent::Advisory
    } else if lowered.contains("report") {
        Intent::Report
    } else if lowered.contains("rag") {
        Intent::Rag
    } else if lowered.contains("image") {
        Intent::Image
    } else if lowered.contains("general") {
        Intent::General
    } else {
        Intent::Database
    }
}

/// Full classification: cascade first, model fallback last.
pub async fn classify(llm: &dyn LlmClient, utterance: &str) -> Result<Intent, RouterError> {
    if let Some(intent) = classify_rules(utterance) {
        return Ok(intent);
    }

    let answer =
        llm.complete(&fallback_prompt(utterance)).await.map_err(RouterError::upstream)?;
    Ok(parse_fallback_answer(answer.trim()))
}
