//! Driver attachment for a single configured device

use crate::output::{Formattable, OutputFormat, OutputFormatter};
use anyhow::{Context, Result};
use nvmetest_core::TestConfig;
use nvmetest_driver::{
    AttachReport, DriverAttachmentController, DriverState, FabricsSettings, FabricsTransition,
    ShellExecutor,
};
use serde::Serialize;
use std::sync::Arc;

/// Result of attaching one device
#[derive(Debug, Serialize)]
pub struct AttachSummary {
    pub device: String,
    #[serde(flatten)]
    pub report: AttachReport,
    pub state: DriverState,
}

impl Formattable for AttachSummary {
    fn table_headers() -> Vec<String> {
        ["Device", "Kernel", "Teardown", "Fabrics", "Kernel attached", "Fabrics up"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn table_row(&self) -> Vec<String> {
        vec![
            self.device.clone(),
            self.report.kernel.to_string(),
            self.report.teardown.to_string(),
            self.report.fabrics.to_string(),
            self.state.kernel_attached.to_string(),
            self.state.fabrics_up.to_string(),
        ]
    }

    fn key_value_pairs(&self) -> Vec<(String, String)> {
        Self::table_headers().into_iter().zip(self.table_row()).collect()
    }
}

/// Attach the device configured under `uri`
pub async fn attach_device(
    config: &TestConfig,
    executor: Arc<ShellExecutor>,
    uri: &str,
    nsid: Option<u32>,
    output_format: OutputFormat,
) -> Result<()> {
    let formatter = OutputFormatter::new(output_format);
    let device = config.device(uri, nsid).ok_or_else(|| match nsid {
        Some(n) => anyhow::anyhow!("No configured device with uri '{}' and nsid {}", uri, n),
        None => anyhow::anyhow!("No configured device with uri '{}'", uri),
    })?;

    let mut controller = DriverAttachmentController::from_config(
        executor,
        config,
        FabricsSettings::default(),
    );
    let report = controller
        .attach(device)
        .await
        .with_context(|| format!("Failed to attach {}", uri))?;

    if let FabricsTransition::Failed(reason) = &report.fabrics {
        formatter.print_warning(&format!("Fabrics bring-up failed: {}", reason))?;
    }

    formatter.print_item(&AttachSummary {
        device: uri.to_string(),
        report,
        state: controller.state(),
    })
}
