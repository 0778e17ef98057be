//! Fabrics target commands

use crate::output::{OutputFormat, OutputFormatter};
use crate::FabricsCommands;
use anyhow::{Context, Result};
use nvmetest_core::TestConfig;
use nvmetest_driver::{fabrics, FabricsOrchestrator, FabricsSettings, ShellExecutor};
use std::time::Duration;

/// Handle fabrics commands
pub async fn handle_fabrics_command(
    config: &TestConfig,
    executor: &ShellExecutor,
    action: FabricsCommands,
    output_format: OutputFormat,
) -> Result<()> {
    let formatter = OutputFormatter::new(output_format);

    match action {
        FabricsCommands::Plan => {
            let orchestrator = FabricsOrchestrator::from_config(config, FabricsSettings::default())?;
            formatter.print_list(&orchestrator.plan())?;
        }
        FabricsCommands::Up { settle } => {
            let mut settings = FabricsSettings::default();
            if let Some(seconds) = settle {
                settings = settings.with_settle(Duration::from_secs(seconds));
            }

            let orchestrator = FabricsOrchestrator::from_config(config, settings)?;
            let spec = orchestrator.spec();
            formatter.print_info(&format!(
                "Exporting {} controller(s) on {}:{}",
                spec.pcie_ids.len(),
                spec.ip,
                spec.port
            ))?;

            orchestrator
                .bring_up(executor)
                .await
                .context("Fabrics bring-up failed")?;
            formatter.print_success("Fabrics target is up")?;
        }
        FabricsCommands::Down => {
            fabrics::teardown(executor)
                .await
                .context("Fabrics teardown failed")?;
            formatter.print_success("Fabrics target stopped")?;
        }
    }

    Ok(())
}
