//! The default `run` flow: update if needed, then launch.

use crate::cli::update::run_update_cycle;
use crate::config::LauncherConfig;
use crate::core::user_friendly_error;
use crate::process::launch_detached;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Check for an update, apply it, then launch the application.
///
/// This is what runs when the launcher is invoked with no subcommand.
/// An update failure is reported but never strands the user: if a
/// runnable executable exists, it is launched regardless.
#[derive(Args, Default)]
pub struct RunCommand {
    /// Skip the update check and launch immediately
    #[arg(long)]
    skip_update: bool,
}

impl RunCommand {
    /// Run the full startup flow.
    ///
    /// # Errors
    ///
    /// Returns an error only when no runnable executable exists after
    /// the update attempt; update failures alone are reported, not
    /// propagated.
    pub async fn execute(self, config: LauncherConfig) -> Result<()> {
        if !self.skip_update && config.update.check_on_startup {
            if let Err(e) = run_update_cycle(&config, false, false).await {
                // Report, then fall through to launching whatever is installed
                user_friendly_error(e).display();
            }
        }

        let executable = config.executable_path();
        if !executable.exists() {
            anyhow::bail!(
                "no runnable application found at {}; run '{}' once an installation exists",
                executable.display(),
                "launchpad update".bold()
            );
        }

        launch_detached(&executable)?;
        println!("{} {}", "Launched".green().bold(), config.app.name);
        Ok(())
    }
}
