//! Backend configuration listing

use crate::output::{OutputFormat, OutputFormatter};
use anyhow::Result;
use nvmetest_core::{normalize_platform, Axis, TestConfig};
use nvmetest_params::{backend_configs, ParametrizationBuilder};

/// List the backend configurations of a platform
pub fn list_combos(
    config: &TestConfig,
    options: Option<Vec<Axis>>,
    labels: Vec<String>,
    platform: Option<String>,
    output_format: OutputFormat,
) -> Result<()> {
    let builder = ParametrizationBuilder::from_config(config)?;
    let platform = match platform {
        Some(name) => normalize_platform(Some(&name)),
        None => builder.platform().to_string(),
    };

    let configs = backend_configs(builder.table(), &platform, options.as_deref(), labels.as_slice());
    OutputFormatter::new(output_format).print_list(&configs)
}
