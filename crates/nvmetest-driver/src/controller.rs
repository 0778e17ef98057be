//! Driver-attachment control between test cases
//!
//! Tests either need the device bound to the kernel NVMe driver or detached
//! from it for userspace drivers. Some also need the fabrics target running.
//! The controller remembers what it last did and only issues commands when
//! the next case needs something different.

use crate::fabrics::{self, FabricsOrchestrator, FabricsSettings};
use crate::state::{DriverState, TriState};
use nvmetest_core::{CommandExecutor, Device, Error, FabricsSpec, Result, TestConfig};
use nvmetest_params::{DeviceCase, TestCase};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Detaches devices from the kernel driver
pub const DETACH_COMMAND: &str = "xnvme-driver";

/// Returns devices to the kernel driver
pub const REATTACH_COMMAND: &str = "xnvme-driver reset";

/// Refreshes and prints the device enumeration
pub const ENUMERATE_COMMAND: &str = "xnvme enum";

/// What happened to the kernel driver binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelTransition {
    Detached,
    Reattached,
    Unchanged,
}

/// What happened to a possibly running fabrics target before re-attaching
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum TeardownOutcome {
    NotNeeded,
    Stopped,
    Failed(String),
}

/// What happened to the fabrics target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum FabricsTransition {
    /// The device does not use fabrics
    NotNeeded,
    /// The target was already known to be down and was left alone
    Unchanged,
    BroughtUp,
    Failed(String),
}

impl fmt::Display for KernelTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelTransition::Detached => f.write_str("detached"),
            KernelTransition::Reattached => f.write_str("reattached"),
            KernelTransition::Unchanged => f.write_str("unchanged"),
        }
    }
}

impl fmt::Display for TeardownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownOutcome::NotNeeded => f.write_str("not needed"),
            TeardownOutcome::Stopped => f.write_str("stopped"),
            TeardownOutcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

impl fmt::Display for FabricsTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FabricsTransition::NotNeeded => f.write_str("not needed"),
            FabricsTransition::Unchanged => f.write_str("unchanged"),
            FabricsTransition::BroughtUp => f.write_str("up"),
            FabricsTransition::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Every decision `attach` took for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachReport {
    pub kernel: KernelTransition,
    pub teardown: TeardownOutcome,
    pub fabrics: FabricsTransition,
}

impl AttachReport {
    /// True when no command changed the host
    pub fn is_noop(&self) -> bool {
        self.kernel == KernelTransition::Unchanged
            && self.teardown == TeardownOutcome::NotNeeded
            && matches!(
                self.fabrics,
                FabricsTransition::NotNeeded | FabricsTransition::Unchanged
            )
    }
}

/// Puts the test host into the driver state each device needs
pub struct DriverAttachmentController {
    executor: Arc<dyn CommandExecutor>,
    state: DriverState,
    fabrics: Option<FabricsSpec>,
    repository: Option<PathBuf>,
    settings: FabricsSettings,
}

impl DriverAttachmentController {
    /// Create a controller without fabrics configuration
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            state: DriverState::new(),
            fabrics: None,
            repository: None,
            settings: FabricsSettings::default(),
        }
    }

    /// Create a controller using the fabrics and repository sections of `config`
    ///
    /// Either section may be absent; attaching a fabrics device then fails
    /// with `ConfigurationMissing`.
    pub fn from_config(
        executor: Arc<dyn CommandExecutor>,
        config: &TestConfig,
        settings: FabricsSettings,
    ) -> Self {
        Self {
            executor,
            state: DriverState::new(),
            fabrics: config.fabrics.clone(),
            repository: config
                .xnvme
                .as_ref()
                .map(|x| x.repository.path.clone()),
            settings,
        }
    }

    /// The current cached driver state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Prepare the host for a test case
    ///
    /// Skipped cases and cases without a device need nothing and return
    /// `None`.
    pub async fn prepare(&mut self, case: &TestCase) -> Result<Option<AttachReport>> {
        match (&case.device, case.is_runnable()) {
            (Some(device), true) => self.attach(device).await.map(Some),
            _ => {
                debug!("Case {} needs no attachment", case.id);
                Ok(None)
            }
        }
    }

    /// Prepare the host for a device-only case
    pub async fn prepare_device(&mut self, case: &DeviceCase) -> Result<Option<AttachReport>> {
        match (&case.device, case.outcome.is_runnable()) {
            (Some(device), true) => self.attach(device).await.map(Some),
            _ => Ok(None),
        }
    }

    /// Make the driver state match what `device` needs
    pub async fn attach(&mut self, device: &Device) -> Result<AttachReport> {
        let needs_kernel = device.needs_kernel();
        let kernel_attached = self.state.kernel_attached;

        let (kernel, teardown) = if !needs_kernel && kernel_attached.maybe_true() {
            self.detach().await?;
            (KernelTransition::Detached, TeardownOutcome::NotNeeded)
        } else if needs_kernel && kernel_attached.maybe_false() {
            let teardown = self.stop_fabrics().await;
            self.reattach().await?;
            (KernelTransition::Reattached, teardown)
        } else {
            debug!(
                "{}: driver attachment already {} (kernel_attached={})",
                device.uri, device.driver_attachment, kernel_attached
            );
            (KernelTransition::Unchanged, TeardownOutcome::NotNeeded)
        };

        let fabrics = if device.needs_fabrics() {
            self.start_fabrics().await?
        } else {
            FabricsTransition::NotNeeded
        };

        Ok(AttachReport {
            kernel,
            teardown,
            fabrics,
        })
    }

    async fn detach(&mut self) -> Result<()> {
        info!("Detaching devices from the kernel driver");
        self.executor.run_checked(DETACH_COMMAND, None).await?;
        self.state.kernel_attached = TriState::False;
        self.refresh_enumeration().await;
        Ok(())
    }

    async fn reattach(&mut self) -> Result<()> {
        info!("Re-attaching devices to the kernel driver");
        self.executor.run_checked(REATTACH_COMMAND, None).await?;
        self.state.kernel_attached = TriState::True;
        self.refresh_enumeration().await;
        Ok(())
    }

    // Any teardown error, including one from the executor itself, is swallowed.
    async fn stop_fabrics(&mut self) -> TeardownOutcome {
        if !self.state.fabrics_up.maybe_true() {
            return TeardownOutcome::NotNeeded;
        }

        match fabrics::teardown(self.executor.as_ref()).await {
            Ok(()) => {
                self.state.fabrics_up = TriState::False;
                TeardownOutcome::Stopped
            }
            Err(e) => {
                error!("Failed to stop fabrics target, continuing: {}", e);
                TeardownOutcome::Failed(e.to_string())
            }
        }
    }

    // Runs when the target may be up; a target known to be down is left alone.
    // Step failures arrive as `SequenceAborted` and are swallowed; only missing
    // configuration fails the case.
    async fn start_fabrics(&mut self) -> Result<FabricsTransition> {
        if !self.state.fabrics_up.maybe_true() {
            debug!("Fabrics target known to be down, not starting it");
            return Ok(FabricsTransition::Unchanged);
        }

        let orchestrator = self.orchestrator()?;
        match orchestrator.bring_up(self.executor.as_ref()).await {
            Ok(()) => {
                self.state.fabrics_up = TriState::True;
                Ok(FabricsTransition::BroughtUp)
            }
            Err(e) if !e.is_fatal_for_case() => {
                error!("Fabrics bring-up failed ({}), continuing: {}", e.category(), e);
                Ok(FabricsTransition::Failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// The orchestrator for the configured fabrics target
    pub fn orchestrator(&self) -> Result<FabricsOrchestrator> {
        let spec = self
            .fabrics
            .clone()
            .ok_or_else(|| Error::missing("fabrics"))?;
        let repository = self
            .repository
            .clone()
            .ok_or_else(|| Error::missing("xnvme.repository"))?;
        Ok(FabricsOrchestrator::new(spec, repository, self.settings.clone()))
    }

    async fn refresh_enumeration(&self) {
        match self.executor.run(ENUMERATE_COMMAND, None).await {
            Ok(output) if output.is_success() => {
                debug!("Device enumeration:\n{}", output.output);
            }
            Ok(output) => warn!("'{}' exited with {}", ENUMERATE_COMMAND, output.exit_code),
            Err(e) => warn!("Could not run '{}': {}", ENUMERATE_COMMAND, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvmetest_core::{Axis, LabelSet};
    use nvmetest_dev::{
        bdev_device, fabrics_device, pcie_device, sample_config, setup_test_logging,
        MockExecutor,
    };
    use nvmetest_params::ParametrizationBuilder;
    use std::time::Duration;

    fn controller(executor: &MockExecutor) -> DriverAttachmentController {
        DriverAttachmentController::from_config(
            Arc::new(executor.clone()),
            &sample_config(),
            FabricsSettings::default().with_settle(Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_userspace_attach_detaches_once() {
        setup_test_logging();
        let executor = MockExecutor::new();
        let mut controller = controller(&executor);

        let report = controller.attach(&pcie_device()).await.unwrap();
        assert_eq!(report.kernel, KernelTransition::Detached);
        assert_eq!(report.fabrics, FabricsTransition::NotNeeded);
        assert_eq!(executor.commands(), vec![DETACH_COMMAND, ENUMERATE_COMMAND]);
        assert_eq!(controller.state().kernel_attached, TriState::False);

        executor.clear_history();
        let report = controller.attach(&pcie_device()).await.unwrap();
        assert!(report.is_noop());
        assert!(executor.commands().is_empty());
    }

    #[tokio::test]
    async fn test_kernel_attach_from_unknown_tears_down_and_resets() {
        let executor = MockExecutor::new();
        let mut controller = controller(&executor);

        let report = controller.attach(&bdev_device()).await.unwrap();
        assert_eq!(report.kernel, KernelTransition::Reattached);
        assert_eq!(report.teardown, TeardownOutcome::Stopped);
        assert_eq!(
            executor.commands(),
            vec![fabrics::TEARDOWN_COMMAND, REATTACH_COMMAND, ENUMERATE_COMMAND]
        );
        assert_eq!(
            controller.state(),
            DriverState {
                kernel_attached: TriState::True,
                fabrics_up: TriState::False,
            }
        );

        executor.clear_history();
        controller.attach(&bdev_device()).await.unwrap();
        assert!(executor.commands().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_failure_is_swallowed() {
        let executor = MockExecutor::new();
        executor.fail_on("pkill", 1);
        let mut controller = controller(&executor);

        let report = controller.attach(&bdev_device()).await.unwrap();
        assert!(matches!(report.teardown, TeardownOutcome::Failed(_)));
        assert_eq!(report.kernel, KernelTransition::Reattached);
        assert_eq!(controller.state().kernel_attached, TriState::True);
        assert_eq!(controller.state().fabrics_up, TriState::Unknown);
    }

    #[tokio::test]
    async fn test_detach_failure_is_fatal_and_keeps_state() {
        let executor = MockExecutor::new();
        executor.respond(DETACH_COMMAND, 4, "no vfio");
        let mut controller = controller(&executor);

        let err = controller.attach(&pcie_device()).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { exit_code: 4, .. }));
        assert_eq!(controller.state(), DriverState::new());
        assert_eq!(executor.count_matching(ENUMERATE_COMMAND), 0);
    }

    #[tokio::test]
    async fn test_reattach_failure_is_fatal() {
        let executor = MockExecutor::new();
        executor.fail_on(REATTACH_COMMAND, 1);
        let mut controller = controller(&executor);

        let err = controller.attach(&bdev_device()).await.unwrap_err();
        assert_eq!(err.failed_command(), Some(REATTACH_COMMAND));
        assert_eq!(controller.state().kernel_attached, TriState::Unknown);
    }

    #[test]
    fn test_transitions_display() {
        assert_eq!(KernelTransition::Reattached.to_string(), "reattached");
        assert_eq!(TeardownOutcome::NotNeeded.to_string(), "not needed");
        assert_eq!(
            FabricsTransition::Failed("step".to_string()).to_string(),
            "failed: step"
        );
    }

    #[tokio::test]
    async fn test_enumeration_failure_only_warns() {
        let executor = MockExecutor::new();
        executor.fail_on(ENUMERATE_COMMAND, 1);
        let mut controller = controller(&executor);

        let report = controller.attach(&pcie_device()).await.unwrap();
        assert_eq!(report.kernel, KernelTransition::Detached);
    }

    #[tokio::test]
    async fn test_fabrics_device_brings_target_up() {
        let executor = MockExecutor::new();
        let mut controller = controller(&executor);

        let report = controller.attach(&fabrics_device()).await.unwrap();
        assert_eq!(report.kernel, KernelTransition::Detached);
        assert_eq!(report.fabrics, FabricsTransition::BroughtUp);
        assert_eq!(controller.state().fabrics_up, TriState::True);
        assert_eq!(executor.count_matching("nvmf_subsystem_add_listener"), 1);

        // The target counts as possibly up, so the next fabrics case runs it again
        executor.clear_history();
        let report = controller.attach(&fabrics_device()).await.unwrap();
        assert_eq!(report.kernel, KernelTransition::Unchanged);
        assert_eq!(report.fabrics, FabricsTransition::BroughtUp);
    }

    #[tokio::test]
    async fn test_fabrics_skipped_when_known_down() {
        let executor = MockExecutor::new();
        let mut controller = controller(&executor);

        controller.attach(&bdev_device()).await.unwrap();
        assert_eq!(controller.state().fabrics_up, TriState::False);

        executor.clear_history();
        let report = controller.attach(&fabrics_device()).await.unwrap();
        assert_eq!(report.kernel, KernelTransition::Detached);
        assert_eq!(report.fabrics, FabricsTransition::Unchanged);
        assert_eq!(executor.count_matching("modprobe"), 0);
    }

    #[tokio::test]
    async fn test_fabrics_failure_keeps_kernel_state() {
        let executor = MockExecutor::new();
        executor.fail_on("modprobe nvmet_tcp", 1);
        let mut controller = controller(&executor);

        let report = controller.attach(&fabrics_device()).await.unwrap();
        assert!(matches!(report.fabrics, FabricsTransition::Failed(_)));
        assert_eq!(controller.state().kernel_attached, TriState::False);
        assert_eq!(controller.state().fabrics_up, TriState::Unknown);
        assert_eq!(executor.count_matching("make"), 0);
        assert_eq!(executor.count_matching("./nvmf_tgt"), 0);
    }

    #[tokio::test]
    async fn test_fabrics_step_that_cannot_run_is_swallowed() {
        let executor = MockExecutor::new();
        executor.error_on("make");
        let mut controller = controller(&executor);

        let report = controller.attach(&fabrics_device()).await.unwrap();
        assert_eq!(report.kernel, KernelTransition::Detached);
        assert!(matches!(report.fabrics, FabricsTransition::Failed(_)));
        assert_eq!(
            controller.state(),
            DriverState {
                kernel_attached: TriState::False,
                fabrics_up: TriState::Unknown,
            }
        );
    }

    #[tokio::test]
    async fn test_fabrics_without_configuration() {
        let executor = MockExecutor::new();
        let mut controller = DriverAttachmentController::new(Arc::new(executor.clone()));

        let err = controller.attach(&fabrics_device()).await.unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing(ref s) if s == "fabrics"));
        assert!(err.is_fatal_for_case());
        // The kernel transition happened before the fabrics step
        assert_eq!(controller.state().kernel_attached, TriState::False);
    }

    #[tokio::test]
    async fn test_prepare_skips_unrunnable_cases() {
        let executor = MockExecutor::new();
        let mut controller = controller(&executor);

        let builder = ParametrizationBuilder::new(
            vec![bdev_device()],
            Default::default(),
            "linux",
        );
        let cases = builder.build(&LabelSet::from(["dev"]), Some(&[Axis::Be]));

        for case in &cases {
            let report = controller.prepare(case).await.unwrap();
            assert_eq!(report.is_some(), case.is_runnable());
        }
        // Only the bdev case touched the host
        assert_eq!(
            executor.commands(),
            vec![fabrics::TEARDOWN_COMMAND, REATTACH_COMMAND, ENUMERATE_COMMAND]
        );

        let device_case = &builder.build_device_cases(&LabelSet::from(["pcie"]))[0];
        assert_eq!(controller.prepare_device(device_case).await.unwrap(), None);
    }
}
