//! Domain and destructive-action guardrails. Both are case-insensitive
//! substring matches over fixed vocabularies: deliberately high recall, low
//! precision. A false positive costs one over-permissive pass to a handler
//! that has its own checks; a false negative would block a legitimate
//! request outright.

/// Operational vocabulary gating the whole router.
const SMARTCITY_KEYWORDS: &[&str] = &[
    "traffic",
    "congestion",
    "signal",
    "road",
    "pothole",
    "accident",
    "vehicle",
    "parking",
    "air quality",
    "pollution",
    "aqi",
    "noise",
    "streetlight",
    "garbage",
    "waste",
    "drainage",
    "sewage",
    "water",
    "crowd",
    "bus",
    "metro",
    "complaint",
    "infrastructure",
    "smart city",
];

/// Mutating SQL verbs plus abuse terms. Matched against both the raw
/// utterance and any model-generated SQL.
const DESTRUCTIVE_TERMS: &[&str] =
    &["delete", "drop", "truncate", "update", "insert", "alter", "blast", "bomb"];

/// Broader civic-service vocabulary for the email gate: a citizen may mail
/// about services (water supply, public transport) that the data tables do
/// not cover.
const CIVIC_EMAIL_KEYWORDS: &[&str] = &[
    "traffic",
    "accident",
    "streetlight",
    "garbage",
    "pollution",
    "air quality",
    "water",
    "drainage",
    "road",
    "pothole",
    "signal",
    "crowd",
    "noise",
    "public transport",
    "bus",
    "metro",
    "sewage",
    "waste",
    "infrastructure",
    "aqi",
];

/// No negation handling: presence of any term anywhere passes.
pub fn is_in_domain(utterance: &str) -> bool {
    matched_domain_keyword(utterance).is_some()
}

/// The keyword that admitted the utterance, for operator logs.
pub fn matched_domain_keyword(utterance: &str) -> Option<&'static str> {
    let lowered = utterance.to_lowercase();
    SMARTCITY_KEYWORDS.iter().copied().find(|keyword| lowered.contains(keyword))
}

pub fn is_destructive(text: &str) -> bool {
    let lowered = text.to_lowercase();
    DESTRUCTIVE_TERMS.iter().any(|term| lowered.contains(term))
}

pub fn is_civic_email_topic(utterance: &str) -> bool {
    let lowered = utterance.to_lowercase();
    CIVIC_EMAIL_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}
