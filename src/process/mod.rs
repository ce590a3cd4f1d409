//! Process lifecycle guard for the managed application.
//!
//! The installed executable stays locked while running on Windows, so
//! every operation that mutates the install tree must first confirm the
//! application is stopped. Detection and termination go through the
//! platform process tools (`tasklist`/`taskkill` on Windows, `pgrep`/
//! `pkill` elsewhere) and match on the exact image name.
//!
//! [`launch_detached`] starts the application fully detached from the
//! launcher so it survives the launcher exiting.

use crate::constants::KILL_GRACE_INTERVAL;
use crate::core::{LauncherError, Result};
use std::path::Path;
use tokio::process::Command;

/// Queries and terminates the managed application by image name.
#[derive(Debug, Clone)]
pub struct ProcessGuard {
    executable: String,
}

impl ProcessGuard {
    /// Create a guard for the given executable image name (e.g. `app.exe`).
    #[must_use]
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// The image name this guard watches.
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Whether a process with this image name is currently running.
    ///
    /// A failure to query the process table is reported as "not running";
    /// the subsequent file operations will surface any real lock.
    pub async fn is_running(&self) -> bool {
        match self.query_process_table().await {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!("Process table query failed: {e}");
                false
            }
        }
    }

    #[cfg(windows)]
    async fn query_process_table(&self) -> Result<bool> {
        let output = Command::new("tasklist")
            .args(["/FI", &format!("IMAGENAME eq {}", self.executable), "/NH"])
            .output()
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.to_ascii_lowercase().contains(&self.executable.to_ascii_lowercase()))
    }

    #[cfg(not(windows))]
    async fn query_process_table(&self) -> Result<bool> {
        // pgrep -x matches the exact process name
        let status = Command::new("pgrep").args(["-x", &self.executable]).output().await?;
        Ok(status.status.success())
    }

    /// Ensure no process with this image name is running.
    ///
    /// A no-op success when the process is not running. Otherwise sends a
    /// forceful terminate request, waits a short grace interval, and
    /// re-checks.
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::ProcessBusy`] if the process is still
    /// alive after the attempt. Callers needing exclusive access to the
    /// executable must treat this as fatal.
    pub async fn ensure_stopped(&self) -> Result<()> {
        if !self.is_running().await {
            return Ok(());
        }

        tracing::info!("Stopping running instance of {}", self.executable);
        self.terminate().await?;
        tokio::time::sleep(KILL_GRACE_INTERVAL).await;

        if self.is_running().await {
            return Err(LauncherError::ProcessBusy {
                executable: self.executable.clone(),
            });
        }
        Ok(())
    }

    #[cfg(windows)]
    async fn terminate(&self) -> Result<()> {
        Command::new("taskkill").args(["/F", "/IM", &self.executable]).output().await?;
        Ok(())
    }

    #[cfg(not(windows))]
    async fn terminate(&self) -> Result<()> {
        Command::new("pkill").args(["-x", &self.executable]).output().await?;
        Ok(())
    }
}

/// Launch an executable fully detached from the launcher process.
///
/// The child gets its own process group so it is unaffected by the
/// launcher exiting or receiving terminal signals. The working directory
/// is set to the executable's own directory, which is what applications
/// resolving relative resource paths expect.
///
/// # Errors
///
/// Returns an error if the executable does not exist or spawning fails.
pub fn launch_detached(executable_path: &Path) -> Result<()> {
    if !executable_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("executable not found: {}", executable_path.display()),
        )
        .into());
    }

    let workdir = executable_path.parent().unwrap_or_else(|| Path::new("."));
    let mut command = std::process::Command::new(executable_path);
    command
        .current_dir(workdir)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    command.spawn()?;
    tracing::info!("Launched {}", executable_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_nonexistent_process_is_not_running() {
        let guard = ProcessGuard::new("definitely-not-a-real-process-name-12345");
        assert!(!guard.is_running().await);
    }

    #[tokio::test]
    async fn test_ensure_stopped_is_noop_when_not_running() {
        let guard = ProcessGuard::new("definitely-not-a-real-process-name-12345");
        guard.ensure_stopped().await.unwrap();
    }

    #[test]
    fn test_launch_missing_executable_fails() {
        let result = launch_detached(Path::new("/nonexistent/dir/app"));
        assert!(result.is_err());
    }
}
