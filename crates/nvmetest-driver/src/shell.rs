//! Command executor running commands on the local host

use async_trait::async_trait;
use nvmetest_core::{CommandExecutor, CommandOutput, ErrorContext, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Exit code reported when a command is killed by a signal or times out
const ABNORMAL_EXIT: i32 = -1;

/// Runs commands through `sh -c` on the machine nvmetest itself runs on
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Option<Duration>,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Kill commands that run longer than `limit`
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(&self, command: &str, cwd: Option<&Path>) -> Result<CommandOutput> {
        debug!("Running '{}' in {:?}", command, cwd);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = match self.timeout {
            Some(limit) => match timeout(limit, cmd.output()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("Command '{}' timed out after {:?}", command, limit);
                    return Ok(CommandOutput::new(
                        ABNORMAL_EXIT,
                        format!("timed out after {:?}", limit),
                    ));
                }
            },
            None => cmd.output().await?,
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        let exit_code = output.status.code().unwrap_or(ABNORMAL_EXIT);
        debug!("Command '{}' exited with {}", command, exit_code);
        Ok(CommandOutput::new(exit_code, combined))
    }

    async fn put(&self, local: &Path, remote: &Path) -> Result<()> {
        debug!("Copying {} to {}", local.display(), remote.display());
        if let Some(parent) = remote.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, remote).await.with_context(format!(
            "failed to copy {} to {}",
            local.display(),
            remote.display()
        ))?;
        Ok(())
    }
}
