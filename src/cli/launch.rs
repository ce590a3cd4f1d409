//! The `launch` subcommand: start the application without update checks.

use crate::config::LauncherConfig;
use crate::process::launch_detached;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Launch the installed application directly.
#[derive(Args, Default)]
pub struct LaunchCommand {}

impl LaunchCommand {
    /// Launch the executable detached from the launcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable is missing or spawning fails.
    pub async fn execute(self, config: LauncherConfig) -> Result<()> {
        let executable = config.executable_path();
        launch_detached(&executable)?;
        println!("{} {}", "Launched".green().bold(), config.app.name);
        Ok(())
    }
}
