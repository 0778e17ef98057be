//! Mock command executor that records every command it is asked to run

use async_trait::async_trait;
use nvmetest_core::{CommandExecutor, CommandOutput, Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// A command as seen by the mock executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub exit_code: i32,
}

/// Scripted response for commands containing a pattern
#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    exit_code: i32,
    output: String,
    launch_error: bool,
}

/// Command executor for tests
///
/// Commands succeed with empty output unless a rule matches. Rules are
/// matched by substring, most recently added first. Clones share the same
/// recording, so a test can hand one clone to the code under test and
/// inspect another.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    inner: Arc<MockExecutorInner>,
}

#[derive(Debug, Default)]
struct MockExecutorInner {
    rules: Mutex<Vec<Rule>>,
    commands: Mutex<Vec<RecordedCommand>>,
    transfers: Mutex<Vec<(PathBuf, PathBuf)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make commands containing `pattern` exit with `exit_code`
    pub fn fail_on(&self, pattern: impl Into<String>, exit_code: i32) -> &Self {
        self.respond(pattern, exit_code, "")
    }

    /// Make commands containing `pattern` fail to launch at all
    ///
    /// `run` returns an error instead of an output, as when the program is
    /// missing from the host. Such commands are recorded with exit code -1.
    pub fn error_on(&self, pattern: impl Into<String>) -> &Self {
        lock(&self.inner.rules).push(Rule {
            pattern: pattern.into(),
            exit_code: -1,
            output: String::new(),
            launch_error: true,
        });
        self
    }

    /// Script the exit code and output of commands containing `pattern`
    pub fn respond(
        &self,
        pattern: impl Into<String>,
        exit_code: i32,
        output: impl Into<String>,
    ) -> &Self {
        lock(&self.inner.rules).push(Rule {
            pattern: pattern.into(),
            exit_code,
            output: output.into(),
            launch_error: false,
        });
        self
    }

    /// Remove all scripted responses
    pub fn clear_rules(&self) {
        lock(&self.inner.rules).clear();
    }

    /// Forget recorded commands and transfers
    pub fn clear_history(&self) {
        lock(&self.inner.commands).clear();
        lock(&self.inner.transfers).clear();
    }

    /// Every command run so far, in order
    pub fn recorded(&self) -> Vec<RecordedCommand> {
        lock(&self.inner.commands).clone()
    }

    /// Command lines run so far, in order
    pub fn commands(&self) -> Vec<String> {
        lock(&self.inner.commands)
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }

    /// Number of commands run that contain `pattern`
    pub fn count_matching(&self, pattern: &str) -> usize {
        lock(&self.inner.commands)
            .iter()
            .filter(|c| c.command.contains(pattern))
            .count()
    }

    /// File transfers requested so far
    pub fn transfers(&self) -> Vec<(PathBuf, PathBuf)> {
        lock(&self.inner.transfers).clone()
    }

    fn rule_for(&self, command: &str) -> Option<Rule> {
        lock(&self.inner.rules)
            .iter()
            .rev()
            .find(|rule| command.contains(&rule.pattern))
            .cloned()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn run(&self, command: &str, cwd: Option<&Path>) -> Result<CommandOutput> {
        let rule = self.rule_for(command);
        let launch_error = rule.as_ref().is_some_and(|r| r.launch_error);
        let response = rule
            .map(|r| CommandOutput::new(r.exit_code, r.output))
            .unwrap_or_else(|| CommandOutput::success(""));
        debug!("mock run: '{}' -> {}", command, response.exit_code);

        lock(&self.inner.commands).push(RecordedCommand {
            command: command.to_string(),
            cwd: cwd.map(Path::to_path_buf),
            exit_code: response.exit_code,
        });

        if launch_error {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("cannot launch '{}'", command),
            )));
        }
        Ok(response)
    }

    async fn put(&self, local: &Path, remote: &Path) -> Result<()> {
        lock(&self.inner.transfers).push((local.to_path_buf(), remote.to_path_buf()));
        Ok(())
    }
}
