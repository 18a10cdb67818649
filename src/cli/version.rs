//! `--version` output.

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One-line description shown next to the version.
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// The line printed for `--version`, e.g. `boardchat 0.1.0 (Streaming AI chat ...)`.
pub fn version_line() -> String {
    format!("{} {} ({})", env!("CARGO_PKG_NAME"), VERSION, DESCRIPTION)
}

/// Print [`version_line`] and exit. Runs before logging or config are set up,
/// so it works without the board credentials.
pub fn handle_version_command() -> ! {
    println!("{}", version_line());
    std::process::exit(0)
}
