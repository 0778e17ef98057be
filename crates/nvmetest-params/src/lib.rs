//! # nvmetest-params
//!
//! Resolves which devices and backend configurations each test case runs
//! against.
//!
//! This crate provides:
//! - Per-platform backend axis tables and their Cartesian product
//! - Projection of combinations onto the axes a test module varies over
//! - Superset label matching of configured devices
//! - CLI argument rendering for a device and backend configuration
//! - The parametrization builder producing runnable and skipped test cases
//!
//! ## Example
//!
//! ```rust
//! use nvmetest_core::{Axis, Device, LabelSet};
//! use nvmetest_params::{CombinationTable, ParametrizationBuilder};
//!
//! let devices = vec![Device::new("/dev/nvme0n1", 1).with_labels(["dev", "bdev"])];
//! let builder = ParametrizationBuilder::new(devices, CombinationTable::builtin(), "linux");
//!
//! for case in builder.build(&LabelSet::from(["dev"]), Some(&[Axis::Be, Axis::Async])) {
//!     println!("{}: {:?}", case.id, case.outcome);
//! }
//! ```

pub mod cli_args;
pub mod combinations;
pub mod matcher;
pub mod parametrize;
pub mod projector;

// Re-export main types
pub use cli_args::format_cli_args;
pub use combinations::{AxisTable, CombinationTable};
pub use matcher::DeviceMatcher;
pub use parametrize::{CaseOutcome, DeviceCase, ParametrizationBuilder, TestCase};
pub use projector::{backend_configs, project};
