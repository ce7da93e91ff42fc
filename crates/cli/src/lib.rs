pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "urbanbot",
    about = "UrbanBot operator CLI",
    long_about = "Operate UrbanBot migrations, config inspection, and one-shot chat requests.",
    after_help = "Examples:\n  urbanbot migrate\n  urbanbot config\n  urbanbot ask \"how many accidents today\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply any pending database migrations
    Migrate,
    /// Print effective configuration values with secrets redacted
    Config,
    /// Send one message to a running urbanbot-server and print the reply
    Ask {
        #[arg(help = "The message to route")]
        message: String,
        #[arg(long, default_value = "http://127.0.0.1:8080", help = "Server base URL")]
        url: String,
    },
}

impl Command {
    fn execute(self) -> CommandResult {
        match self {
            Self::Migrate => commands::migrate::run(),
            Self::Config => CommandResult { exit_code: 0, output: commands::config::run() },
            Self::Ask { message, url } => commands::ask::run(&message, &url),
        }
    }
}

pub fn run() -> ExitCode {
    let result = Cli::parse().command.execute();
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
