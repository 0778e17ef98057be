//! Test-case parametrization

use crate::output::{Formattable, OutputFormat, OutputFormatter};
use anyhow::Result;
use nvmetest_core::{Axis, LabelSet, TestConfig};
use nvmetest_driver::{DriverAttachmentController, FabricsSettings, ShellExecutor};
use nvmetest_params::ParametrizationBuilder;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// How the host was prepared for one case
#[derive(Debug, Serialize)]
pub struct Preparation {
    pub case: String,
    pub kernel: String,
    pub teardown: String,
    pub fabrics: String,
    pub error: Option<String>,
}

impl Formattable for Preparation {
    fn table_headers() -> Vec<String> {
        ["Case", "Kernel", "Teardown", "Fabrics", "Error"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn table_row(&self) -> Vec<String> {
        vec![
            self.case.clone(),
            self.kernel.clone(),
            self.teardown.clone(),
            self.fabrics.clone(),
            self.error.clone().unwrap_or_default(),
        ]
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        Self::table_headers().into_iter().zip(self.table_row()).collect()
    }
}

/// Parametrize a test module and optionally prepare the host for each case
pub async fn list_cases(
    config: &TestConfig,
    executor: Arc<ShellExecutor>,
    labels: Vec<String>,
    options: Option<Vec<Axis>>,
    prepare: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let formatter = OutputFormatter::new(output_format);
    let builder = ParametrizationBuilder::from_config(config)?;
    let cases = builder.build(&LabelSet::from(labels), options.as_deref());

    if !prepare {
        return formatter.print_list(&cases);
    }

    let mut controller = DriverAttachmentController::from_config(
        executor,
        config,
        FabricsSettings::default(),
    );

    let mut preparations = Vec::new();
    for case in &cases {
        let preparation = match controller.prepare(case).await {
            Ok(Some(report)) => Preparation {
                case: case.id.clone(),
                kernel: report.kernel.to_string(),
                teardown: report.teardown.to_string(),
                fabrics: report.fabrics.to_string(),
                error: None,
            },
            Ok(None) => continue,
            Err(e) => {
                error!("Preparing {} failed: {}", case.id, e);
                Preparation {
                    case: case.id.clone(),
                    kernel: String::new(),
                    teardown: String::new(),
                    fabrics: String::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        preparations.push(preparation);
    }

    formatter.print_list(&preparations)?;
    let failed = preparations.iter().filter(|p| p.error.is_some()).count();
    if failed > 0 {
        formatter.print_warning(&format!("{} case(s) could not be prepared", failed))?;
    }
    Ok(())
}
