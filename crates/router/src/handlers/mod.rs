//! Capability handlers. Each one owns the full pipeline for a single
//! intent and shares the common `Handler` contract the dispatcher calls
//! through.

use async_trait::async_trait;
use urbanbot_core::{Envelope, RouterError};

pub mod advisory;
pub mod database;
pub mod email;
pub mod general;
pub mod image;
pub mod knowledge;
pub mod report;

pub use advisory::AdvisoryHandler;
pub use database::DatabaseHandler;
pub use email::EmailHandler;
pub use general::GeneralHandler;
pub use image::ImageHandler;
pub use knowledge::KnowledgeHandler;
pub use report::ReportHandler;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, utterance: &str) -> Result<Envelope, RouterError>;
}
