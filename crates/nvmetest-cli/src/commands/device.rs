//! Device lookup by labels

use crate::output::{OutputFormat, OutputFormatter};
use anyhow::Result;
use nvmetest_core::{LabelSet, TestConfig};
use nvmetest_params::ParametrizationBuilder;

/// Show the device a test requiring `labels` would run against
pub fn show_device(config: &TestConfig, labels: Vec<String>, output_format: OutputFormat) -> Result<()> {
    let formatter = OutputFormatter::new(output_format);
    let builder = ParametrizationBuilder::from_config(config)?;

    for case in builder.build_device_cases(&LabelSet::from(labels)) {
        match (&case.device, case.outcome.skip_reason()) {
            (Some(device), _) => formatter.print_item(device)?,
            (None, Some(reason)) => formatter.print_warning(reason)?,
            (None, None) => {}
        }
    }
    Ok(())
}
