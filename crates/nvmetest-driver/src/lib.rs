//! # nvmetest-driver
//!
//! Driver-attachment control for nvmetest. Before each test case the
//! [`DriverAttachmentController`] binds devices to the kernel NVMe driver or
//! detaches them for userspace drivers, and brings up the NVMe-over-fabrics
//! target through the [`FabricsOrchestrator`] when the device needs it.
//!
//! Commands reach the test host through a
//! [`CommandExecutor`](nvmetest_core::CommandExecutor); [`ShellExecutor`]
//! runs them locally.

pub mod controller;
pub mod fabrics;
pub mod shell;
pub mod state;

pub use controller::{
    AttachReport, DriverAttachmentController, FabricsTransition, KernelTransition,
    TeardownOutcome,
};
pub use fabrics::{FabricsOrchestrator, FabricsSettings, FabricsStep};
pub use shell::ShellExecutor;
pub use state::{DriverState, TriState};
