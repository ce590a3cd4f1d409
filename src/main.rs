//! Launcher CLI entry point.
//!
//! Parses arguments, runs the selected command, and renders any failure
//! as a user-friendly error with suggestions before exiting non-zero.

use anyhow::Result;
use clap::Parser;
use launchpad_cli::cli;
use launchpad_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
