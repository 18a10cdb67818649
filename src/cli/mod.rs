//! CLI module for boardchat.
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing
//! - Version display
//! - One-shot and interactive chat sessions
//!
//! # Usage
//!
//! ```ignore
//! use boardchat::cli::{parse_args, CliCommand};
//!
//! match parse_args(std::env::args()) {
//!     CliCommand::Version => handle_version_command(),
//!     CliCommand::Prompt(text) => run_prompt(&client, &text, &mut stdout, &mut stderr).await?,
//!     CliCommand::Interactive => run_interactive(&client, stdin, &mut stdout, &mut stderr).await?,
//! }
//! ```

pub mod args;
pub mod session;
pub mod version;

pub use args::{parse_args, CliCommand};
pub use session::{run_interactive, run_prompt, ERROR_NOTICE, QUIT_COMMAND};
pub use version::{handle_version_command, version_line, DESCRIPTION, VERSION};
