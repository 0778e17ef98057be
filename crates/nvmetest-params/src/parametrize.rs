//! Test-case parametrization
//!
//! Builds the list of test invocations for a test module: one case per
//! backend configuration, each paired with the device that satisfies the
//! module's labels plus the configuration's transport label. Cases without a
//! device are skipped, not failed; the environment simply lacks the
//! hardware for them.

use crate::cli_args::format_cli_args;
use crate::combinations::CombinationTable;
use crate::matcher::DeviceMatcher;
use crate::projector::backend_configs;
use nvmetest_core::labels::{LABEL_FILE, TRANSPORT_LABELS};
use nvmetest_core::{Axis, BackendConfig, Device, LabelSet, Result, TestConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Whether a case can run in the current environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum CaseOutcome {
    Runnable,
    Skipped(String),
}

impl CaseOutcome {
    fn no_device(search: &LabelSet) -> Self {
        CaseOutcome::Skipped(format!("no device labelled {}", search))
    }

    pub fn is_runnable(&self) -> bool {
        matches!(self, CaseOutcome::Runnable)
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            CaseOutcome::Runnable => None,
            CaseOutcome::Skipped(reason) => Some(reason),
        }
    }
}

/// One test invocation: a device, a backend configuration and its CLI form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    /// Stable identifier, `uri=<uri-or-None>,<axis>=<value>,...`
    pub id: String,
    pub device: Option<Device>,
    pub config: BackendConfig,
    pub cli_args: String,
    #[serde(flatten)]
    pub outcome: CaseOutcome,
}

impl TestCase {
    fn new(device: Option<&Device>, config: BackendConfig, outcome: CaseOutcome) -> Self {
        let uri = device.map(|d| d.uri.as_str()).unwrap_or("None");
        Self {
            id: format!("uri={},{}", uri, config),
            cli_args: format_cli_args(device, &config),
            device: device.cloned(),
            config,
            outcome,
        }
    }

    pub fn is_runnable(&self) -> bool {
        self.outcome.is_runnable()
    }
}

/// A test invocation that needs a device but no backend configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceCase {
    pub id: String,
    pub device: Option<Device>,
    #[serde(flatten)]
    pub outcome: CaseOutcome,
}

/// Builds test cases from the configured devices and backend combinations
#[derive(Debug, Clone)]
pub struct ParametrizationBuilder {
    devices: Vec<Device>,
    table: CombinationTable,
    platform: String,
}

impl ParametrizationBuilder {
    pub fn new(devices: Vec<Device>, table: CombinationTable, platform: impl Into<String>) -> Self {
        Self {
            devices,
            table,
            platform: platform.into(),
        }
    }

    /// Create a builder from a loaded configuration
    ///
    /// Uses the configuration's `combinations` section when present and the
    /// built-in table otherwise.
    pub fn from_config(config: &TestConfig) -> Result<Self> {
        let table = match &config.combinations {
            Some(section) => CombinationTable::from_config(section)?,
            None => CombinationTable::builtin(),
        };
        Ok(Self::new(config.devices.clone(), table, config.platform()))
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn table(&self) -> &CombinationTable {
        &self.table
    }

    /// Backend configurations for `options`, limited to `only_labels`
    pub fn backend_configs<S: AsRef<str>>(
        &self,
        options: Option<&[Axis]>,
        only_labels: &[S],
    ) -> Vec<BackendConfig> {
        backend_configs(&self.table, &self.platform, options, only_labels)
    }

    /// Build one case per backend configuration
    ///
    /// File-labelled modules only see file configurations; all other modules
    /// see the block, character, PCIe and fabrics configurations.
    pub fn build(&self, labels: &LabelSet, options: Option<&[Axis]>) -> Vec<TestCase> {
        let only_labels: &[&str] = if labels.contains(LABEL_FILE) {
            &[LABEL_FILE]
        } else {
            &TRANSPORT_LABELS
        };

        let matcher = DeviceMatcher::new(&self.devices);
        let cases: Vec<TestCase> = self
            .backend_configs(options, only_labels)
            .into_iter()
            .map(|config| {
                let mut search = labels.clone();
                search.extend(config.label().map(str::to_string));

                match matcher.find(&search) {
                    Some(device) => TestCase::new(Some(device), config, CaseOutcome::Runnable),
                    None => TestCase::new(None, config, CaseOutcome::no_device(&search)),
                }
            })
            .collect();

        let runnable = cases.iter().filter(|c| c.is_runnable()).count();
        info!(
            "Parametrized {} cases for labels {} ({} runnable, {} skipped)",
            cases.len(),
            labels,
            runnable,
            cases.len() - runnable
        );
        cases
    }

    /// Build the single device-only case for `labels`
    pub fn build_device_cases(&self, labels: &LabelSet) -> Vec<DeviceCase> {
        let case = match DeviceMatcher::new(&self.devices).find(labels) {
            Some(device) => DeviceCase {
                id: format!("uri={}", device.uri),
                device: Some(device.clone()),
                outcome: CaseOutcome::Runnable,
            },
            None => {
                debug!("No device labelled {}", labels);
                DeviceCase {
                    id: "uri=None".to_string(),
                    device: None,
                    outcome: CaseOutcome::no_device(labels),
                }
            }
        };
        vec![case]
    }
}
