//! Core types shared across the UrbanBot workspace:
//!
//! - `config` - layered application configuration (file, env, overrides)
//! - `collab` - async contracts for the external collaborators (LLM,
//!   data store, knowledge store, object storage, mailer)
//! - `envelope` - the single response contract handlers must produce
//! - `errors` - the router error taxonomy with fixed user-facing messages
//! - `record` - ordered column/value rows returned by read queries
//! - `schema` - the city schema description the query synthesizer prompts with
//!
//! Nothing in this crate performs I/O; implementations of the collaborator
//! traits live in `urbanbot-db` and `urbanbot-server`.

pub mod collab;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod record;
pub mod schema;

pub use collab::{DataStore, KnowledgeChunk, KnowledgeStore, LlmClient, Mailer, ObjectStore};
pub use envelope::Envelope;
pub use errors::{DomainScope, RouterError};
pub use record::Record;
