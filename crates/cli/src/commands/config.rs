use secrecy::ExposeSecret;
use urbanbot_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines =
        vec!["effective config (source precedence: overrides > env > file > default):".to_string()];

    lines.push(render_line("database.url", &config.database.url));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
    ));
    lines.push(render_line("database.timeout_secs", &config.database.timeout_secs.to_string()));

    lines.push(render_line("llm.base_url", &config.llm.base_url));
    lines.push(render_line("llm.model", &config.llm.model));
    lines.push(render_line("llm.embed_model", &config.llm.embed_model));
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line("llm.api_key", &api_key));

    lines.push(render_line("storage.public_base_url", &config.storage.public_base_url));
    lines.push(render_line(
        "storage.signing_secret",
        &redact(config.storage.signing_secret.expose_secret()),
    ));
    lines.push(render_line(
        "storage.url_expiry_secs",
        &config.storage.url_expiry_secs.to_string(),
    ));

    lines.push(render_line(
        "email.relay_endpoint",
        config.email.relay_endpoint.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line("email.sender", &config.email.sender));
    lines.push(render_line("email.recipient", &config.email.recipient));

    lines.push(render_line("server.bind_address", &config.server.bind_address));
    lines.push(render_line("server.port", &config.server.port.to_string()));

    lines.push(render_line("logging.level", &config.logging.level));
    lines.push(render_line("logging.format", &format!("{:?}", config.logging.format)));

    lines.join("\n")
}

fn render_line(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}
