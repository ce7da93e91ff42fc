use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Runtime configuration, resolved in precedence order: built-in defaults,
/// then the TOML file, then `URBANBOT_*` environment variables, then
/// explicit overrides passed by the caller.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub embed_model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub public_base_url: String,
    pub signing_secret: SecretString,
    pub url_expiry_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub relay_endpoint: Option<String>,
    pub api_token: Option<SecretString>,
    pub sender: String,
    pub recipient: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub storage_signing_secret: Option<String>,
    pub email_recipient: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://urbanbot.db".into(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                base_url: "https://api.groq.com/openai/v1".into(),
                api_key: None,
                model: "llama3-8b-8192".into(),
                embed_model: "text-embedding-3-small".into(),
                timeout_secs: 30,
            },
            storage: StorageConfig {
                public_base_url: "https://storage.urbanbot.local".into(),
                signing_secret: String::new().into(),
                url_expiry_secs: 3600,
            },
            email: EmailConfig {
                relay_endpoint: None,
                api_token: None,
                sender: "urbanbot@city.local".into(),
                recipient: "operations@city.local".into(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".into(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".into(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unknown log format `{other}`; valid values are compact, pretty, and json"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match locate_config_file(options.config_path.as_deref()) {
            Some(path) => load_file_patch(&path)?.merge(&mut config),
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from("urbanbot.toml"));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        env_str("URBANBOT_DATABASE_URL", &mut self.database.url);
        env_num("URBANBOT_DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections)?;
        env_num("URBANBOT_DATABASE_TIMEOUT_SECS", &mut self.database.timeout_secs)?;

        env_str("URBANBOT_LLM_BASE_URL", &mut self.llm.base_url);
        env_secret("URBANBOT_LLM_API_KEY", &mut self.llm.api_key);
        env_str("URBANBOT_LLM_MODEL", &mut self.llm.model);
        env_str("URBANBOT_LLM_EMBED_MODEL", &mut self.llm.embed_model);
        env_num("URBANBOT_LLM_TIMEOUT_SECS", &mut self.llm.timeout_secs)?;

        env_str("URBANBOT_STORAGE_PUBLIC_BASE_URL", &mut self.storage.public_base_url);
        if let Some(secret) = read_env("URBANBOT_STORAGE_SIGNING_SECRET") {
            self.storage.signing_secret = secret.into();
        }
        env_num("URBANBOT_STORAGE_URL_EXPIRY_SECS", &mut self.storage.url_expiry_secs)?;

        env_opt("URBANBOT_EMAIL_RELAY_ENDPOINT", &mut self.email.relay_endpoint);
        env_secret("URBANBOT_EMAIL_API_TOKEN", &mut self.email.api_token);
        env_str("URBANBOT_EMAIL_SENDER", &mut self.email.sender);
        env_str("URBANBOT_EMAIL_RECIPIENT", &mut self.email.recipient);

        env_str("URBANBOT_SERVER_BIND_ADDRESS", &mut self.server.bind_address);
        env_num("URBANBOT_SERVER_PORT", &mut self.server.port)?;
        env_num("URBANBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &mut self.server.graceful_shutdown_secs)?;

        // The short aliases predate the sectioned names; both stay supported.
        if let Some(level) =
            read_env("URBANBOT_LOGGING_LEVEL").or_else(|| read_env("URBANBOT_LOG_LEVEL"))
        {
            self.logging.level = level;
        }
        if let Some(format) =
            read_env("URBANBOT_LOGGING_FORMAT").or_else(|| read_env("URBANBOT_LOG_FORMAT"))
        {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            database_url,
            log_level,
            llm_base_url,
            llm_api_key,
            llm_model,
            storage_signing_secret,
            email_recipient,
        } = overrides;

        assign(&mut self.database.url, database_url);
        assign(&mut self.logging.level, log_level);
        assign(&mut self.llm.base_url, llm_base_url);
        assign(&mut self.llm.model, llm_model);
        assign(&mut self.email.recipient, email_recipient);
        if let Some(key) = llm_api_key {
            self.llm.api_key = Some(key.into());
        }
        if let Some(secret) = storage_signing_secret {
            self.storage.signing_secret = secret.into();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.llm.validate()?;
        self.storage.validate()?;
        self.email.validate()?;
        self.server.validate()?;
        self.logging.validate()
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if !(url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:") {
            return Err(invalid(
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
            ));
        }
        if self.max_connections == 0 {
            return Err(invalid("database.max_connections must be at least 1"));
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(invalid("database.timeout_secs must be between 1 and 300"));
        }
        Ok(())
    }
}

impl LlmConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.base_url) {
            return Err(invalid(
                "llm.base_url must be an http(s) URL for an OpenAI-compatible endpoint",
            ));
        }
        if self.model.trim().is_empty() || self.embed_model.trim().is_empty() {
            return Err(invalid("llm.model and llm.embed_model must not be empty"));
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(invalid("llm.timeout_secs must be between 1 and 300"));
        }
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.expose_secret().trim().is_empty() {
            return Err(invalid(
                "storage.signing_secret is required to sign retrieval URLs. Set it in \
                 urbanbot.toml or via URBANBOT_STORAGE_SIGNING_SECRET",
            ));
        }
        if !is_http_url(&self.public_base_url) {
            return Err(invalid("storage.public_base_url must start with http:// or https://"));
        }
        // Signed URLs are time-limited by contract; an unbounded or week-long
        // expiry would defeat that.
        if !(60..=86_400).contains(&self.url_expiry_secs) {
            return Err(invalid("storage.url_expiry_secs must be in range 60..=86400"));
        }
        Ok(())
    }
}

impl EmailConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let Some(endpoint) = &self.relay_endpoint else { return Ok(()) };
        if !is_http_url(endpoint) {
            return Err(invalid("email.relay_endpoint must start with http:// or https://"));
        }
        if self.recipient.trim().is_empty() {
            return Err(invalid(
                "email.recipient is required when email.relay_endpoint is configured",
            ));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(invalid("server.port must be nonzero"));
        }
        if self.graceful_shutdown_secs == 0 {
            return Err(invalid("server.graceful_shutdown_secs must be nonzero"));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => {
                Err(invalid(format!("logging.level `{other}` is not a tracing level name")))
            }
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn assign(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_str(key: &str, slot: &mut String) {
    if let Some(value) = read_env(key) {
        *slot = value;
    }
}

fn env_opt(key: &str, slot: &mut Option<String>) {
    if let Some(value) = read_env(key) {
        *slot = Some(value);
    }
}

fn env_secret(key: &str, slot: &mut Option<SecretString>) {
    if let Some(value) = read_env(key) {
        *slot = Some(value.into());
    }
}

fn env_num<T: FromStr>(key: &str, slot: &mut T) -> Result<(), ConfigError> {
    let Some(value) = read_env(key) else { return Ok(()) };
    *slot = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value,
    })?;
    Ok(())
}

fn locate_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => ["urbanbot.toml", "config/urbanbot.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists()),
    }
}

fn load_file_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` references against the process environment. A missing
/// variable is an error rather than an empty string, so a typo in the file
/// cannot silently blank out a secret.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let expr = &rest[start + 2..];
        let end = expr.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &expr[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &expr[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    storage: Option<StoragePatch>,
    email: Option<EmailPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

impl ConfigPatch {
    fn merge(self, config: &mut AppConfig) {
        if let Some(patch) = self.database {
            assign(&mut config.database.url, patch.url);
            merge_num(&mut config.database.max_connections, patch.max_connections);
            merge_num(&mut config.database.timeout_secs, patch.timeout_secs);
        }
        if let Some(patch) = self.llm {
            assign(&mut config.llm.base_url, patch.base_url);
            assign(&mut config.llm.model, patch.model);
            assign(&mut config.llm.embed_model, patch.embed_model);
            merge_num(&mut config.llm.timeout_secs, patch.timeout_secs);
            if let Some(key) = patch.api_key {
                config.llm.api_key = Some(key.into());
            }
        }
        if let Some(patch) = self.storage {
            assign(&mut config.storage.public_base_url, patch.public_base_url);
            merge_num(&mut config.storage.url_expiry_secs, patch.url_expiry_secs);
            if let Some(secret) = patch.signing_secret {
                config.storage.signing_secret = secret.into();
            }
        }
        if let Some(patch) = self.email {
            assign(&mut config.email.sender, patch.sender);
            assign(&mut config.email.recipient, patch.recipient);
            if let Some(endpoint) = patch.relay_endpoint {
                config.email.relay_endpoint = Some(endpoint);
            }
            if let Some(token) = patch.api_token {
                config.email.api_token = Some(token.into());
            }
        }
        if let Some(patch) = self.server {
            assign(&mut config.server.bind_address, patch.bind_address);
            merge_num(&mut config.server.port, patch.port);
            merge_num(&mut config.server.graceful_shutdown_secs, patch.graceful_shutdown_secs);
        }
        if let Some(patch) = self.logging {
            assign(&mut config.logging.level, patch.level);
            if let Some(format) = patch.format {
                config.logging.format = format;
            }
        }
    }
}

fn merge_num<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    embed_model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    public_base_url: Option<String>,
    signing_secret: Option<String>,
    url_expiry_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    relay_endpoint: Option<String>,
    api_token: Option<String>,
    sender: Option<String>,
    recipient: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
