//! Natural-language operations router
//!
//! This crate is the "brain" of UrbanBot: it takes a free-text request,
//! classifies its intent, dispatches it to a capability handler, and
//! enforces the safety guardrails before any generated action (a SQL read,
//! an email, a knowledge lookup) is allowed to execute.
//!
//! # Architecture
//!
//! One pass per utterance, no state between calls:
//! 1. **Guardrails** (`guard`) - domain membership + destructive-action
//!    filtering
//! 2. **Intent Classification** (`intent`) - ordered rule cascade, LLM
//!    fallback last
//! 3. **Capability Handlers** (`handlers`) - one strategy per intent over a
//!    shared contract
//! 4. **Query Synthesis** (`synth`) - NL -> sanitized, SELECT-only SQL
//! 5. **Result Shaping** (`shape`) - raw rows -> response envelope
//!
//! # Safety Principle
//!
//! The language model is strictly a translator and narrator. Its output is
//! adversarial input: generated SQL passes the destructive-action filter
//! and a SELECT-only structural gate before execution, and narration is
//! grounded to values the store actually returned.

pub mod dispatch;
pub mod guard;
pub mod handlers;
pub mod intent;
pub mod shape;
pub mod synth;

pub use dispatch::Dispatcher;
pub use intent::Intent;
