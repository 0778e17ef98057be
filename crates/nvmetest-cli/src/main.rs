//! nvmetest - device selection and driver-attachment control for NVMe testing

use anyhow::Result;
use clap::{Parser, Subcommand};
use nvmetest_core::Axis;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use output::OutputFormat;

/// Device selection and driver-attachment control for NVMe testing
#[derive(Debug, Parser)]
#[command(name = "nvmetest")]
#[command(about = "Device selection and driver-attachment control for NVMe testing")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Kill host commands that run longer than this many seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    command_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the backend configurations of a platform
    Combos {
        /// Axes to vary over (comma-separated: be,mem,admin,sync,async,label)
        #[arg(short = 'x', long, value_delimiter = ',')]
        options: Option<Vec<Axis>>,

        /// Keep only configurations with these labels (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        labels: Vec<String>,

        /// Platform, defaults to the configured OS
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Parametrize a test module by its labels
    Cases {
        /// Labels the test module requires (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        labels: Vec<String>,

        /// Axes to vary over (comma-separated)
        #[arg(short = 'x', long, value_delimiter = ',')]
        options: Option<Vec<Axis>>,

        /// Attach drivers for every runnable case, in order
        #[arg(long)]
        prepare: bool,
    },

    /// Show the device a test with these labels would use
    Device {
        /// Required labels (comma-separated)
        #[arg(value_delimiter = ',', required = true)]
        labels: Vec<String>,
    },

    /// Put the host into the driver state a configured device needs
    Attach {
        /// Device uri as configured
        uri: String,

        /// Namespace id, when the uri is configured more than once
        #[arg(long)]
        nsid: Option<u32>,
    },

    /// Manage the NVMe-over-fabrics target
    Fabrics {
        #[command(subcommand)]
        action: FabricsCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum FabricsCommands {
    /// Bring the fabrics target up
    Up {
        /// Seconds to wait for the target before configuring it
        #[arg(long, value_name = "SECONDS")]
        settle: Option<u64>,
    },

    /// Stop the fabrics target
    Down,

    /// Print the bring-up steps without running them
    Plan,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "nvmetest={0},nvmetest_core={0},nvmetest_params={0},nvmetest_driver={0}",
            log_level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting nvmetest with {:?}", cli);

    let config = config::load(cli.config.as_deref())?;
    let output_format = cli.output;
    let executor = Arc::new(commands::shell_executor(cli.command_timeout));

    match cli.command {
        Commands::Combos {
            options,
            labels,
            platform,
        } => {
            commands::combos::list_combos(&config, options, labels, platform, output_format)?;
        }
        Commands::Cases {
            labels,
            options,
            prepare,
        } => {
            commands::cases::list_cases(&config, executor, labels, options, prepare, output_format).await?;
        }
        Commands::Device { labels } => {
            commands::device::show_device(&config, labels, output_format)?;
        }
        Commands::Attach { uri, nsid } => {
            commands::attach::attach_device(&config, executor, &uri, nsid, output_format).await?;
        }
        Commands::Fabrics { action } => {
            commands::fabrics::handle_fabrics_command(&config, executor.as_ref(), action, output_format).await?;
        }
    }

    Ok(())
}
