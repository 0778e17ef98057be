//! Command implementations for the nvmetest CLI

pub mod attach;
pub mod cases;
pub mod combos;
pub mod device;
pub mod fabrics;

use nvmetest_driver::ShellExecutor;
use std::time::Duration;

/// Executor for commands on the local test host
pub fn shell_executor(timeout_secs: Option<u64>) -> ShellExecutor {
    match timeout_secs {
        Some(secs) => ShellExecutor::new().with_timeout(Duration::from_secs(secs)),
        None => ShellExecutor::new(),
    }
}
