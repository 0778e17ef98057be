//! Core traits for nvmetest components
//!
//! The command channel is the only way nvmetest touches the test host.
//! Implementations may run commands locally, over SSH, or record them for
//! tests.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Result of running a command on the test host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit code; zero means success
    pub exit_code: i32,

    /// Combined stdout and stderr
    pub output: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn success(output: impl Into<String>) -> Self {
        Self::new(0, output)
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait for executing commands and transferring files on the test host
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a shell command, optionally in a working directory
    ///
    /// A non-zero exit code is reported through [`CommandOutput`], not as an
    /// error; `Err` means the command could not be run at all.
    async fn run(&self, command: &str, cwd: Option<&Path>) -> Result<CommandOutput>;

    /// Copy a local file to the test host
    async fn put(&self, local: &Path, remote: &Path) -> Result<()>;

    /// Run a command and turn a non-zero exit code into `CommandFailed`
    async fn run_checked(&self, command: &str, cwd: Option<&Path>) -> Result<CommandOutput> {
        let output = self.run(command, cwd).await?;
        if output.is_success() {
            Ok(output)
        } else {
            debug!("Command '{}' exited with {}", command, output.exit_code);
            Err(Error::command_failed(
                command,
                output.exit_code,
                output.output,
            ))
        }
    }
}
