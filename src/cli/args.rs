//! Command-line argument parsing for boardchat.
//!
//! This module handles parsing command-line arguments and determining
//! which CLI command to execute.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Send a single message and print the reply
    Prompt(String),
    /// Read messages from stdin until `/quit` (default)
    Interactive,
}

/// Parse command-line arguments and return the appropriate command.
///
/// # Arguments
///
/// * `args` - Iterator of command-line arguments (typically `std::env::args()`)
///
/// # Examples
///
/// ```
/// use boardchat::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["boardchat".to_string(), "-p".to_string(), "hi".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Prompt("hi".to_string()));
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            // A missing value is passed on as empty and rejected when sent
            "--prompt" | "-p" => return CliCommand::Prompt(args.next().unwrap_or_default()),
            _ => {
                if let Some(text) = arg.strip_prefix("--prompt=") {
                    return CliCommand::Prompt(text.to_string());
                }
            }
        }
    }
    CliCommand::Interactive
}
