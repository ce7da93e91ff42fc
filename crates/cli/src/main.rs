use std::process::ExitCode;

fn main() -> ExitCode {
    urbanbot_cli::run()
}
