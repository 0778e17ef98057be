//! Error handling for nvmetest
//!
//! Provides a unified error type and result type for use across all nvmetest components.

/// Result type alias for nvmetest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for nvmetest
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration section required by the operation is absent
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Configuration is present but malformed
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// An external command returned a non-zero exit code
    #[error("Command failed with exit code {exit_code}: {command}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    /// A multi-step procedure stopped at its first failing step
    #[error("Sequence aborted at step '{step}': {source}")]
    SequenceAborted {
        step: String,
        #[source]
        source: Box<Error>,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration loading errors
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a configuration-missing error
    pub fn missing(section: impl Into<String>) -> Self {
        Self::ConfigurationMissing(section.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a command failure
    pub fn command_failed(
        command: impl Into<String>,
        exit_code: i32,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            output: output.into(),
        }
    }

    /// Wrap the error of a failed step of a sequence
    pub fn aborted(step: impl Into<String>, source: Error) -> Self {
        Self::SequenceAborted {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Exit code of the command that caused this error, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { exit_code, .. } => Some(*exit_code),
            Error::SequenceAborted { source, .. } => source.exit_code(),
            _ => None,
        }
    }

    /// The command line that failed, if any
    pub fn failed_command(&self) -> Option<&str> {
        match self {
            Error::CommandFailed { command, .. } => Some(command),
            Error::SequenceAborted { source, .. } => source.failed_command(),
            _ => None,
        }
    }

    /// Whether the error must abort the preparation of a test case
    pub fn is_fatal_for_case(&self) -> bool {
        !matches!(self, Error::SequenceAborted { .. })
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::ConfigurationMissing(_) => "configuration_missing",
            Error::InvalidConfiguration(_) => "configuration",
            Error::CommandFailed { .. } => "command_failed",
            Error::SequenceAborted { .. } => "sequence_aborted",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Config(_) => "config",
            Error::Other(_) => "other",
        }
    }
}

/// Prefixes an error with what was being attempted
pub trait ErrorContext<T> {
    fn with_context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn with_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let cause: Error = e.into();
            Error::Other(anyhow::anyhow!("{}: {}", context.into(), cause))
        })
    }
}
