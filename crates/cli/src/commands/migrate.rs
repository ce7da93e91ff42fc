//! Apply pending migrations using the same config resolution as the
//! server, so the CLI and the service always agree on the database.

use urbanbot_core::config::{AppConfig, LoadOptions};
use urbanbot_db::{connect_with_settings, migrations};

use crate::commands::CommandResult;

enum MigrateFailure {
    Config(String),
    Runtime(String),
    Connect(String),
    Apply(String),
}

impl MigrateFailure {
    fn into_parts(self) -> (&'static str, String, u8) {
        match self {
            Self::Config(message) => ("config_validation", message, 2),
            Self::Runtime(message) => ("runtime_init", message, 3),
            Self::Connect(message) => ("db_connectivity", message, 4),
            Self::Apply(message) => ("migration", message, 5),
        }
    }
}

pub fn run() -> CommandResult {
    match execute() {
        Ok(message) => CommandResult::success("migrate", message),
        Err(failure) => {
            let (error_class, message, exit_code) = failure.into_parts();
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

fn execute() -> Result<String, MigrateFailure> {
    let config = AppConfig::load(LoadOptions::default())
        .map_err(|error| MigrateFailure::Config(format!("configuration issue: {error}")))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| MigrateFailure::Runtime(error.to_string()))?;

    runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| MigrateFailure::Connect(error.to_string()))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| MigrateFailure::Apply(error.to_string()))?;
        pool.close().await;

        Ok(format!("applied pending migrations to {}", config.database.url))
    })
}
