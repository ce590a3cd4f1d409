//! Command-line interface for the launcher.
//!
//! The CLI is intentionally small: the default invocation (no
//! subcommand) runs the full startup flow of checking for an update,
//! applying it, and launching the application. The remaining subcommands
//! expose the individual pieces for scripts and troubleshooting:
//!
//! - `update` - check for and apply an update without launching
//! - `backup` - snapshot the installed tree
//! - `restore` - restore the snapshot (downgrade)
//! - `launch` - launch the application without update checks
//!
//! # Global Options
//!
//! - `--config <path>` - explicit launcher configuration file
//! - `--verbose` - debug-level logging
//! - `--quiet` - errors only
//! - `--no-progress` - disable progress bars

mod backup;
mod launch;
mod run;
mod update;

use crate::config::LauncherConfig;
use crate::constants::NO_PROGRESS_ENV_VAR;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use backup::{BackupCommand, RestoreCommand};
pub use launch::LaunchCommand;
pub use run::RunCommand;
pub use update::UpdateCommand;

/// Top-level CLI definition.
#[derive(Parser)]
#[command(name = "launchpad", version, about = "Self-updating application launcher")]
pub struct Cli {
    /// The subcommand to execute; defaults to the full run flow.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the launcher configuration file.
    ///
    /// Overrides both the `LAUNCHPAD_CONFIG` environment variable and
    /// the default `launcher.toml` next to the launcher executable.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug-level logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log errors only.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress bars and spinners.
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Available launcher subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check for an update, apply it, then launch the application
    Run(RunCommand),
    /// Check for and apply an update without launching
    Update(UpdateCommand),
    /// Snapshot the installed application tree
    Backup(BackupCommand),
    /// Restore the snapshot over the installed tree
    Restore(RestoreCommand),
    /// Launch the application without any update check
    Launch(LaunchCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// Initializes logging from the verbosity flags, loads the launcher
    /// configuration, and dispatches to the subcommand. With no
    /// subcommand the full run flow executes.
    ///
    /// # Errors
    ///
    /// Propagates any error from configuration loading or the executed
    /// command; the binary entry point renders it for the user.
    pub async fn execute(self) -> Result<()> {
        init_tracing(self.verbose, self.quiet);

        if self.no_progress {
            // Set before any operation spawns tasks reading the environment
            unsafe { std::env::set_var(NO_PROGRESS_ENV_VAR, "1") };
        }

        let config = LauncherConfig::load_with_optional(self.config.clone())?;

        match self.command {
            None => RunCommand::default().execute(config).await,
            Some(Commands::Run(cmd)) => cmd.execute(config).await,
            Some(Commands::Update(cmd)) => cmd.execute(config).await,
            Some(Commands::Backup(cmd)) => cmd.execute(config).await,
            Some(Commands::Restore(cmd)) => cmd.execute(config).await,
            Some(Commands::Launch(cmd)) => cmd.execute(config).await,
        }
    }
}

/// Initialize the tracing subscriber from the verbosity flags.
///
/// An explicit `RUST_LOG` value always wins, so operators can scope
/// logging to individual modules regardless of the flags.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
