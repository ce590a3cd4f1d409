//! The `backup` and `restore` subcommands.

use crate::backup::BackupManager;
use crate::config::LauncherConfig;
use crate::utils::progress::ProgressBar;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Snapshot the installed application tree.
#[derive(Args, Default)]
pub struct BackupCommand {}

impl BackupCommand {
    /// Create the snapshot.
    ///
    /// # Errors
    ///
    /// Propagates snapshot failures, including a missing install
    /// directory.
    pub async fn execute(self, config: LauncherConfig) -> Result<()> {
        let manager = BackupManager::new(config.install_dir(), &config.executable_name());

        let spinner = ProgressBar::new_spinner();
        spinner.set_prefix("💾");
        spinner.set_message("Creating snapshot...");
        let result = manager.create_backup().await;
        spinner.finish_and_clear();
        result?;

        println!(
            "{} {}",
            "Snapshot created at".green().bold(),
            manager.backup_dir().display()
        );
        Ok(())
    }
}

/// Restore the snapshot over the installed tree.
#[derive(Args, Default)]
pub struct RestoreCommand {}

impl RestoreCommand {
    /// Restore the snapshot.
    ///
    /// # Errors
    ///
    /// Propagates restore failures, including the absence of any
    /// snapshot and a running application that refuses to stop.
    pub async fn execute(self, config: LauncherConfig) -> Result<()> {
        let manager = BackupManager::new(config.install_dir(), &config.executable_name());

        let spinner = ProgressBar::new_spinner();
        spinner.set_prefix("⏪");
        spinner.set_message("Restoring snapshot...");
        let result = manager.downgrade().await;
        spinner.finish_and_clear();
        result?;

        println!("{}", "Previous version restored".green().bold());
        Ok(())
    }
}
