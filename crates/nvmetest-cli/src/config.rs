//! Configuration loading for the nvmetest CLI

use anyhow::{Context, Result};
use nvmetest_core::TestConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of the test-host configuration
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(config_dir.join("nvmetest").join("config.yaml"))
}

/// Load the test-host configuration
///
/// An explicit path must exist. Without one the default location is tried,
/// and an empty configuration is used when nothing is there.
pub fn load(config_path: Option<&Path>) -> Result<TestConfig> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                info!(
                    "No configuration at {}, using an empty one",
                    path.display()
                );
                return Ok(TestConfig::default());
            }
            path
        }
    };

    let config = TestConfig::load_from_file(&path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))?;

    debug!(
        "Loaded {} device(s) from {}",
        config.devices.len(),
        path.display()
    );
    Ok(config)
}
