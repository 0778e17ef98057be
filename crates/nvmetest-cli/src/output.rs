//! Output formatting for the nvmetest CLI

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use nvmetest_core::{Axis, BackendConfig, Device};
use nvmetest_driver::FabricsStep;
use nvmetest_params::{CaseOutcome, TestCase};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Compact text format
    Text,
}

/// Trait for types that can be formatted for output
pub trait Formattable {
    /// Format as a table row
    fn table_headers() -> Vec<String>;
    fn table_row(&self) -> Vec<String>;

    /// Format as key-value pairs for detailed view
    fn key_value_pairs(&self) -> Vec<(String, String)>;
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| h.to_string()).collect()
}

impl Formattable for BackendConfig {
    fn table_headers() -> Vec<String> {
        Axis::ALL.iter().map(|a| a.as_str().to_string()).collect()
    }

    fn table_row(&self) -> Vec<String> {
        Axis::ALL
            .iter()
            .map(|axis| self.get(*axis).unwrap_or("-").to_string())
            .collect()
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(axis, value)| (axis.to_string(), value.to_string()))
            .collect()
    }
}

impl Formattable for Device {
    fn table_headers() -> Vec<String> {
        headers(&["URI", "NSID", "Attachment", "Labels"])
    }

    fn table_row(&self) -> Vec<String> {
        vec![
            self.uri.clone(),
            self.nsid.to_string(),
            self.driver_attachment.to_string(),
            self.labels.to_string(),
        ]
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        Self::table_headers().into_iter().zip(self.table_row()).collect()
    }
}

fn outcome_text(outcome: &CaseOutcome) -> String {
    match outcome {
        CaseOutcome::Runnable => "runnable".to_string(),
        CaseOutcome::Skipped(reason) => format!("skipped: {}", reason),
    }
}

impl Formattable for TestCase {
    fn table_headers() -> Vec<String> {
        headers(&["Device", "Configuration", "Outcome", "CLI args"])
    }

    fn table_row(&self) -> Vec<String> {
        vec![
            self.device
                .as_ref()
                .map(|d| d.uri.clone())
                .unwrap_or_else(|| "-".to_string()),
            self.config.to_string(),
            outcome_text(&self.outcome),
            self.cli_args.clone(),
        ]
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("Id".to_string(), self.id.clone())];
        pairs.extend(Self::table_headers().into_iter().zip(self.table_row()));
        pairs
    }
}

impl Formattable for FabricsStep {
    fn table_headers() -> Vec<String> {
        headers(&["Step", "Command", "Directory"])
    }

    fn table_row(&self) -> Vec<String> {
        match self {
            FabricsStep::Run { name, command, cwd, ignore_failure } => vec![
                if *ignore_failure {
                    format!("{} (may fail)", name)
                } else {
                    name.clone()
                },
                command.clone(),
                cwd.as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ],
            FabricsStep::Settle { delay } => {
                vec![self.name().to_string(), format!("sleep {:?}", delay), String::new()]
            }
        }
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        vec![(self.name().to_string(), self.to_string())]
    }
}

/// Output formatter
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format and print a single item
    pub fn print_item<T>(&self, item: &T) -> Result<()>
    where
        T: Serialize + Formattable,
    {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(item)?),
            OutputFormat::Table => {
                for (key, value) in item.key_value_pairs() {
                    println!("{}: {}", key.bold().cyan(), value);
                }
            }
            OutputFormat::Text => {
                for (key, value) in item.key_value_pairs() {
                    println!("{}: {}", key, value);
                }
            }
        }
        Ok(())
    }

    /// Format and print a list of items
    pub fn print_list<T>(&self, items: &[T]) -> Result<()>
    where
        T: Serialize + Formattable,
    {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(items)?),
            OutputFormat::Table | OutputFormat::Text if items.is_empty() => {
                println!("{}", "No items found".dimmed());
            }
            OutputFormat::Table => println!("{}", render_table(items)),
            OutputFormat::Text => {
                for item in items {
                    println!("{}", item.table_row().join("  "));
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn print_success(&self, message: &str) -> Result<()> {
        self.print_status("success", message, || {
            println!("{} {}", "✓".green().bold(), message.green())
        })
    }

    /// Print a warning message
    pub fn print_warning(&self, message: &str) -> Result<()> {
        self.print_status("warning", message, || {
            eprintln!("{} {}", "⚠".yellow().bold(), message.yellow())
        })
    }

    /// Print an info message
    pub fn print_info(&self, message: &str) -> Result<()> {
        self.print_status("info", message, || {
            println!("{} {}", "ℹ".blue().bold(), message.blue())
        })
    }

    fn print_status(&self, status: &str, message: &str, human: impl FnOnce()) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let result = serde_json::json!({
                    "status": status,
                    "message": message
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            OutputFormat::Yaml => {
                println!("status: {}", status);
                println!("message: {}", message);
            }
            OutputFormat::Table | OutputFormat::Text => human(),
        }
        Ok(())
    }
}

/// Render items as a table
pub fn render_table<T: Formattable>(items: &[T]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = T::table_headers()
        .iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for item in items {
        table.add_row(item.table_row());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_backend_config_row_covers_every_axis() {
        let config = BackendConfig::new()
            .with(Axis::Be, "linux")
            .with(Axis::Label, "bdev");

        assert_eq!(BackendConfig::table_headers().len(), Axis::ALL.len());
        assert_eq!(
            config.table_row(),
            vec!["linux", "-", "-", "-", "-", "bdev"]
        );
    }

    #[test]
    fn test_device_pairs() {
        let device = Device::new("/dev/nvme0n1", 1).with_labels(["dev", "bdev"]);
        let pairs = device.key_value_pairs();
        assert_eq!(pairs[0], ("URI".to_string(), "/dev/nvme0n1".to_string()));
        assert_eq!(pairs[3].1, "[dev, bdev]");
    }

    #[test]
    fn test_fabrics_step_rows() {
        let settle = FabricsStep::Settle {
            delay: Duration::from_secs(2),
        };
        assert_eq!(settle.table_row()[1], "sleep 2s");
        assert_eq!(FabricsStep::table_headers().len(), settle.table_row().len());
    }

    #[test]
    fn test_render_table_has_rows() {
        let devices = vec![
            Device::new("/dev/nvme0n1", 1),
            Device::new("/dev/ng0n1", 1),
        ];
        let rendered = render_table(&devices).to_string();
        assert!(rendered.contains("/dev/ng0n1"));
        assert!(rendered.contains("URI"));
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(outcome_text(&CaseOutcome::Runnable), "runnable");
        assert_eq!(
            outcome_text(&CaseOutcome::Skipped("no device labelled [pcie]".into())),
            "skipped: no device labelled [pcie]"
        );
    }
}
