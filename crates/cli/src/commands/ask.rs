//! One-shot chat against a running urbanbot-server. Keeps the CLI free
//! of collaborator credentials; the server owns those.

use serde_json::{json, Value};

use crate::commands::CommandResult;

pub fn run(message: &str, base_url: &str) -> CommandResult {
    if message.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "message must not be empty", 2);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let endpoint = format!("{}/chat", base_url.trim_end_matches('/'));
    let result = runtime.block_on(async {
        let response = reqwest::Client::new()
            .post(&endpoint)
            .json(&json!({ "message": message }))
            .send()
            .await
            .map_err(|error| ("transport", error.to_string(), 4u8))?
            .error_for_status()
            .map_err(|error| ("server_status", error.to_string(), 5u8))?;

        response
            .json::<Value>()
            .await
            .map_err(|error| ("response_parse", error.to_string(), 5u8))
    });

    match result {
        Ok(envelope) => CommandResult::success("ask", render_envelope(&envelope)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}

fn render_envelope(envelope: &Value) -> String {
    match envelope.get("kind").and_then(Value::as_str) {
        Some("text") => envelope
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some("image") => {
            let title = envelope.get("title").and_then(Value::as_str).unwrap_or("Image");
            let url = envelope.get("url").and_then(Value::as_str).unwrap_or_default();
            let city = envelope.get("city").and_then(Value::as_str).unwrap_or_default();
            let time = envelope.get("time").and_then(Value::as_str).unwrap_or_default();
            let insight = envelope.get("insight").and_then(Value::as_str).unwrap_or_default();
            format!("{title} - {city} ({time})\n{url}\n{insight}")
        }
        _ => envelope.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_envelope, run};

    #[test]
    fn empty_message_is_rejected_before_any_request() {
        let result = run("  ", "http://127.0.0.1:8080");
        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("invalid_input"));
    }

    #[test]
    fn text_envelope_renders_its_content() {
        let envelope = json!({"kind": "text", "content": "No accidents detected so far."});
        assert_eq!(render_envelope(&envelope), "No accidents detected so far.");
    }

    #[test]
    fn image_envelope_renders_title_url_and_insight() {
        let envelope = json!({
            "kind": "image",
            "url": "https://storage.urbanbot.local/a.jpg?signature=x",
            "title": "Latest TRAFFIC Image",
            "city": "Salem",
            "time": "2026-08-29 07:45:00",
            "insight": "Minor queueing at the junction."
        });
        let rendered = render_envelope(&envelope);
        assert!(rendered.starts_with("Latest TRAFFIC Image - Salem (2026-08-29 07:45:00)"));
        assert!(rendered.contains("signature=x"));
        assert!(rendered.ends_with("Minor queueing at the junction."));
    }
}
