pub mod ask;
pub mod config;
pub mod migrate;

use serde_json::json;

/// Outcome of a subcommand: one JSON line for stdout plus the process exit
/// code. Machine callers key off `status` and `error_class`, not the text.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self { exit_code: 0, output: render(command, "ok", None, &message.into()) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self { exit_code, output: render(command, "error", Some(error_class), &message.into()) }
    }
}

fn render(command: &str, status: &str, error_class: Option<&str>, message: &str) -> String {
    json!({
        "command": command,
        "status": status,
        "error_class": error_class,
        "message": message,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::CommandResult;

    #[test]
    fn success_outcome_serializes_without_error_class() {
        let result = CommandResult::success("migrate", "applied pending migrations");
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("\"status\":\"ok\""));
        assert!(result.output.contains("\"error_class\":null"));
    }

    #[test]
    fn failure_outcome_carries_class_and_exit_code() {
        let result = CommandResult::failure("ask", "transport", "connection refused", 4);
        assert_eq!(result.exit_code, 4);
        assert!(result.output.contains("\"error_class\":\"transport\""));
        assert!(result.output.contains("connection refused"));
    }
}
