//! # nvmetest-dev
//!
//! Development and testing utilities for nvmetest.
//!
//! This crate provides:
//! - A recording mock of the command executor with scripted exit codes
//! - Sample devices and configurations covering every transport class
//! - Test logging setup

pub mod mock_executor;
pub mod utils;

// Re-export commonly used types
pub use mock_executor::{MockExecutor, RecordedCommand};
pub use utils::{
    bdev_device, cdev_device, fabrics_device, file_device, pcie_device, sample_config,
    sample_fabrics, setup_test_logging,
};
