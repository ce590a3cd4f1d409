//! The `update` subcommand: check for and apply an update.

use crate::backup::BackupManager;
use crate::config::LauncherConfig;
use crate::updater::Updater;
use crate::utils::progress::ProgressBar;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Check the release host and install any newer version.
#[derive(Args, Default)]
pub struct UpdateCommand {
    /// Only check and report; do not download or install
    #[arg(long)]
    check: bool,

    /// Print the installed and latest versions, then exit
    #[arg(long, conflicts_with = "check")]
    status: bool,

    /// Skip the pre-apply snapshot even when configured
    #[arg(long)]
    no_backup: bool,
}

impl UpdateCommand {
    /// Run the update cycle.
    ///
    /// # Errors
    ///
    /// Propagates check, download, and apply failures.
    pub async fn execute(self, config: LauncherConfig) -> Result<()> {
        if self.status {
            return print_status(&config).await;
        }

        let applied = run_update_cycle(&config, self.check, self.no_backup).await?;
        if !applied && !self.check {
            println!("{}", "Already up to date".green());
        }
        Ok(())
    }
}

/// Report the installed and latest versions side by side.
async fn print_status(config: &LauncherConfig) -> Result<()> {
    let mut updater = Updater::new(config.clone())?;
    let installed = updater
        .installed_version()
        .map_or_else(|| "none".to_string(), |v| v.to_string());

    match updater.check_for_updates().await? {
        Some(info) => {
            println!("Installed: {installed}");
            println!("Latest:    {} {}", info.version, "(update available)".yellow());
            if let Some(date) = &info.release_date {
                // Render the timestamp as a plain date
                println!("Published: {}", date.chars().take(10).collect::<String>());
            }
        }
        None => {
            println!("Installed: {installed}");
            println!("Latest:    {installed} {}", "(up to date)".green());
        }
    }
    Ok(())
}

/// Drive one complete check-download-apply cycle.
///
/// Returns `true` when an update was applied, `false` when the installed
/// version is current or `check_only` stopped after the check.
///
/// # Errors
///
/// Propagates any failure from the updater or the pre-apply snapshot.
pub async fn run_update_cycle(
    config: &LauncherConfig,
    check_only: bool,
    no_backup: bool,
) -> Result<bool> {
    let mut updater = Updater::new(config.clone())?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_prefix("🔍");
    spinner.set_message("Checking for updates...");
    let check_result = updater.check_for_updates().await;
    spinner.finish_and_clear();

    let Some(info) = check_result? else {
        return Ok(false);
    };

    println!(
        "{} {} {} {}",
        "Update available:".bold(),
        updater
            .installed_version()
            .map_or_else(|| "none".to_string(), |v| v.to_string()),
        "→".cyan(),
        info.version.to_string().green().bold()
    );
    if !info.changelog.trim().is_empty() {
        println!("\n{}\n", info.changelog.trim());
    }

    if check_only {
        return Ok(false);
    }

    if config.update.auto_backup && !no_backup {
        let manager = BackupManager::new(config.install_dir(), &config.executable_name());
        if config.install_dir().is_dir() {
            if let Err(e) = manager.create_backup().await {
                tracing::warn!("Pre-update snapshot failed: {e}");
            }
        }
    }

    let bar = ProgressBar::new_download(info.file_size);
    bar.set_prefix("📥");
    let download_result = updater
        .download_update(None, |downloaded, _total| bar.set_position(downloaded))
        .await;
    bar.finish_and_clear();
    download_result?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_prefix("🔄");
    spinner.set_message("Installing update...");
    let apply_result = updater.apply_update(true).await;
    spinner.finish_and_clear();

    updater.cleanup().await;
    apply_result?;

    println!("{} {}", "Updated to".green().bold(), info.version);
    Ok(true)
}
