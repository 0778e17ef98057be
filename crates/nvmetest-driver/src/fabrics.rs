//! NVMe-over-fabrics target orchestration
//!
//! Brings up an SPDK `nvmf_tgt` exporting local PCIe controllers over TCP,
//! and tears it down again. The procedure is fail-fast: the first failing
//! step aborts the sequence and nothing already done is undone.

use nvmetest_core::{CommandExecutor, Error, FabricsSpec, Result, TestConfig};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Command that stops any running fabrics target
pub const TEARDOWN_COMMAND: &str = "pkill -f nvmf_tgt";

/// Tunables of the fabrics target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FabricsSettings {
    /// Kernel modules loaded before the target starts
    pub modules: Vec<String>,
    pub trtype: String,
    pub adrfam: String,
    /// Extra options for `nvmf_create_transport`
    pub transport_opts: String,
    /// Wait between starting the target and talking to it
    pub settle: Duration,
}

impl Default for FabricsSettings {
    fn default() -> Self {
        Self {
            modules: ["nvme", "nvmet", "nvmet_tcp", "nvme_fabrics", "nvme_tcp"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            trtype: "tcp".to_string(),
            adrfam: "ipv4".to_string(),
            transport_opts: "-u 16384 -m 8 -c 8192".to_string(),
            settle: Duration::from_secs(2),
        }
    }
}

impl FabricsSettings {
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

/// One step of the bring-up procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FabricsStep {
    Run {
        name: String,
        command: String,
        cwd: Option<PathBuf>,
        /// A non-zero exit does not abort the procedure
        ignore_failure: bool,
    },
    Settle { delay: Duration },
}

impl FabricsStep {
    fn run(name: impl Into<String>, command: impl Into<String>) -> Self {
        FabricsStep::Run {
            name: name.into(),
            command: command.into(),
            cwd: None,
            ignore_failure: false,
        }
    }

    fn run_in(name: impl Into<String>, command: impl Into<String>, cwd: PathBuf) -> Self {
        FabricsStep::Run {
            name: name.into(),
            command: command.into(),
            cwd: Some(cwd),
            ignore_failure: false,
        }
    }

    fn ignoring_failure(mut self) -> Self {
        if let FabricsStep::Run { ignore_failure, .. } = &mut self {
            *ignore_failure = true;
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            FabricsStep::Run { name, .. } => name,
            FabricsStep::Settle { .. } => "settle",
        }
    }

    /// The command line, if the step runs one
    pub fn command(&self) -> Option<&str> {
        match self {
            FabricsStep::Run { command, .. } => Some(command),
            FabricsStep::Settle { .. } => None,
        }
    }
}

impl fmt::Display for FabricsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FabricsStep::Run { command, cwd: Some(cwd), .. } => {
                write!(f, "{} (in {})", command, cwd.display())
            }
            FabricsStep::Run { command, .. } => f.write_str(command),
            FabricsStep::Settle { delay } => write!(f, "sleep {:?}", delay),
        }
    }
}

/// Brings the fabrics target up and down on the test host
#[derive(Debug, Clone)]
pub struct FabricsOrchestrator {
    spec: FabricsSpec,
    repository: PathBuf,
    settings: FabricsSettings,
}

impl FabricsOrchestrator {
    pub fn new(spec: FabricsSpec, repository: impl Into<PathBuf>, settings: FabricsSettings) -> Self {
        Self {
            spec,
            repository: repository.into(),
            settings,
        }
    }

    /// Create an orchestrator from the `fabrics` and `xnvme.repository` sections
    pub fn from_config(config: &TestConfig, settings: FabricsSettings) -> Result<Self> {
        let spec = config.require_fabrics()?.clone();
        let repository = config.require_repository()?;
        Ok(Self::new(spec, repository, settings))
    }

    pub fn spec(&self) -> &FabricsSpec {
        &self.spec
    }

    fn spdk(&self) -> PathBuf {
        self.repository.join("subprojects").join("spdk")
    }

    fn rpc(&self) -> String {
        self.spdk()
            .join("scripts")
            .join("rpc.py")
            .display()
            .to_string()
    }

    /// The bring-up procedure as an ordered list of steps
    pub fn plan(&self) -> Vec<FabricsStep> {
        let settings = &self.settings;
        let rpc = self.rpc();
        let mut steps = Vec::new();

        for module in &settings.modules {
            steps.push(FabricsStep::run(
                format!("load {}", module),
                format!("modprobe {}", module),
            ));
        }
        steps.push(FabricsStep::run("detach devices", "xnvme-driver"));
        steps.push(FabricsStep::run_in(
            "build nvmf_tgt",
            "make",
            self.spdk().join("app").join("nvmf_tgt"),
        ));
        steps.push(FabricsStep::run("stop nvmf_tgt", TEARDOWN_COMMAND).ignoring_failure());
        steps.push(FabricsStep::run_in(
            "start nvmf_tgt",
            "(nohup ./nvmf_tgt > foo.out 2> foo.err < /dev/null &)",
            spdk_bin_dir(&self.repository),
        ));
        steps.push(FabricsStep::Settle {
            delay: settings.settle,
        });
        steps.push(FabricsStep::run(
            "create transport",
            format!(
                "{} nvmf_create_transport -t {} {}",
                rpc, settings.trtype, settings.transport_opts
            ),
        ));

        for (index, pcie_id) in self.spec.pcie_ids.iter().enumerate() {
            let n = index + 1;
            let nqn = format!("{}{}", self.spec.subnqn_prefix, n);

            steps.push(FabricsStep::run(
                format!("create subsystem {}", n),
                format!(
                    "{} nvmf_create_subsystem {} -a -s SPDK0000000000000{} -d Controller{}",
                    rpc, nqn, n, n
                ),
            ));
            steps.push(FabricsStep::run(
                format!("attach controller {}", n),
                format!(
                    "{} bdev_nvme_attach_controller -b Nvme{} -t PCIe -a {}",
                    rpc, n, pcie_id
                ),
            ));
            steps.push(FabricsStep::run(
                format!("add namespace {}", n),
                format!("{} nvmf_subsystem_add_ns {} Nvme{}n1", rpc, nqn, n),
            ));
            steps.push(FabricsStep::run(
                format!("add listener {}", n),
                format!(
                    "{} nvmf_subsystem_add_listener {} -t {} -a {} -s {} -f {}",
                    rpc, nqn, settings.trtype, self.spec.ip, self.spec.port, settings.adrfam
                ),
            ));
        }

        steps
    }

    /// Run the bring-up procedure, stopping at the first failing step
    pub async fn bring_up(&self, executor: &dyn CommandExecutor) -> Result<()> {
        info!(
            "Bringing up fabrics target on {}:{} for {} controller(s)",
            self.spec.ip,
            self.spec.port,
            self.spec.pcie_ids.len()
        );

        for step in self.plan() {
            match &step {
                FabricsStep::Settle { delay } => {
                    debug!("Waiting {:?} for nvmf_tgt to settle", delay);
                    tokio::time::sleep(*delay).await;
                }
                FabricsStep::Run {
                    name,
                    command,
                    cwd,
                    ignore_failure,
                } => {
                    let output = match executor.run(command, cwd.as_deref()).await {
                        Ok(output) => output,
                        Err(e) => {
                            error!("Fabrics step '{}' could not run: {}", name, e);
                            return Err(Error::aborted(name.clone(), e));
                        }
                    };
                    if output.is_success() {
                        continue;
                    }
                    if *ignore_failure {
                        debug!("Step '{}' exited with {}, ignored", name, output.exit_code);
                        continue;
                    }

                    error!(
                        "Fabrics step '{}' failed with exit code {}",
                        name, output.exit_code
                    );
                    return Err(Error::aborted(
                        name.clone(),
                        Error::command_failed(command.clone(), output.exit_code, output.output),
                    ));
                }
            }
        }

        info!("Fabrics target is up");
        Ok(())
    }

    /// Stop the fabrics target
    pub async fn teardown(&self, executor: &dyn CommandExecutor) -> Result<()> {
        teardown(executor).await
    }
}

/// Stop any fabrics target, whether or not its configuration is known
pub async fn teardown(executor: &dyn CommandExecutor) -> Result<()> {
    info!("Tearing down fabrics target");
    executor
        .run_checked(TEARDOWN_COMMAND, None)
        .await
        .map(|_| ())
        .map_err(|e| {
            warn!("Fabrics teardown failed: {}", e);
            e
        })
}

/// Path of the SPDK build directory below an xNVMe checkout
pub fn spdk_bin_dir(repository: &Path) -> PathBuf {
    repository.join("subprojects").join("spdk").join("build").join("bin")
}
