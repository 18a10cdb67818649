use boardchat::adapters::ReqwestHttpClient;
use boardchat::chat::ChatClient;
use boardchat::cli::{handle_version_command, parse_args, run_interactive, run_prompt, CliCommand, ERROR_NOTICE};
use boardchat::config::ChatConfig;

use color_eyre::Result;
use std::io;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "boardchat=warn";

/// Structured logs go to stderr so stdout carries only the reply text.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let command = parse_args(std::env::args());

    // Handle --version before any initialization
    if command == CliCommand::Version {
        handle_version_command();
    }

    color_eyre::install()?;
    init_tracing();

    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", ERROR_NOTICE, e.user_message());
            eprintln!("{}", e.recovery_hint());
            std::process::exit(2);
        }
    };
    tracing::debug!(url = %config.chat_url(), "configuration loaded");

    let client = ChatClient::new(config, Arc::new(ReqwestHttpClient::new()));
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let mut stdout = io::stdout();
        let mut stderr = io::stderr();

        match command {
            CliCommand::Prompt(text) => {
                if run_prompt(&client, &text, &mut stdout, &mut stderr).await.is_err() {
                    std::process::exit(1);
                }
            }
            CliCommand::Interactive => {
                eprintln!("boardchat: type a message and press Enter, {} to exit", boardchat::cli::QUIT_COMMAND);
                let stdin = BufReader::new(tokio::io::stdin());
                run_interactive(&client, stdin, &mut stdout, &mut stderr).await?;
            }
            CliCommand::Version => {}
        }

        Ok::<_, color_eyre::Report>(())
    })
}
