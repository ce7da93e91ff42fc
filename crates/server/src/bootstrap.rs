use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use urbanbot_core::config::{AppConfig, ConfigError, LoadOptions};
use urbanbot_core::Mailer;
use urbanbot_db::{connect_with_settings, migrations, DbPool, SqlDataStore, SqlKnowledgeStore};
use urbanbot_router::Dispatcher;

use crate::llm::LlmApi;
use crate::mailer::{DisabledMailer, MailRelay};
use crate::storage::UrlSigner;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not open database `{url}`: {source}")]
    Database { url: String, source: sqlx::Error },
    #[error("could not apply migrations: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("could not build the outbound http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    bootstrap_with_config(AppConfig::load(options)?).await
}

/// Wires the dispatcher from a resolved config: pool, migrations, then the
/// five collaborators behind their trait objects.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db = &config.database;
    let db_pool = connect_with_settings(&db.url, db.max_connections, db.timeout_secs)
        .await
        .map_err(|source| BootstrapError::Database { url: db.url.clone(), source })?;
    info!(event_name = "system.bootstrap.database_connected", url = %db.url, "pool ready");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "schema is current");

    let llm = Arc::new(LlmApi::new(&config.llm).map_err(BootstrapError::HttpClient)?);
    let store = Arc::new(SqlDataStore::new(db_pool.clone()));
    let knowledge = Arc::new(SqlKnowledgeStore::new(db_pool.clone()));
    let storage = Arc::new(UrlSigner::new(&config.storage));
    let mailer: Arc<dyn Mailer> =
        match MailRelay::from_config(&config.email).map_err(BootstrapError::HttpClient)? {
            Some(relay) => Arc::new(relay),
            None => Arc::new(DisabledMailer),
        };

    let dispatcher = Arc::new(Dispatcher::new(llm, store, knowledge, storage, mailer));
    info!(event_name = "system.bootstrap.ready", "collaborators wired, dispatcher constructed");

    Ok(Application { config, db_pool, dispatcher })
}
