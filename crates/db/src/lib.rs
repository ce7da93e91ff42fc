pub mod connection;
pub mod knowledge;
pub mod memory;
pub mod migrations;
pub mod store;

pub use connection::{connect_with_settings, DbPool};
pub use knowledge::SqlKnowledgeStore;
pub use memory::{InMemoryDataStore, InMemoryKnowledgeStore, RejectingDataStore};
pub use store::{SqlDataStore, StoreError};
